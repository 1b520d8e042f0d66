//! Append-only completion log. There is no update path; rows leave only
//! through the cascade delete policy on habits.

use crate::completions::{CompletionEvent, Recorded};
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{require_owner, with_immediate_transaction};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;

/// Inserts the (habit, day) fact unless it is already present.
pub fn record(
    conn: &Connection,
    habit_id: i64,
    owner: &str,
    day: NaiveDate,
) -> LedgerResult<Recorded> {
    require_owner(owner)?;
    let inserted = with_immediate_transaction(conn, |tx| {
        Ok(tx.execute(
            "INSERT OR IGNORE INTO habit_completions (habit_id, owner, day) VALUES (?1, ?2, ?3)",
            params![habit_id, owner, day],
        )?)
    })?;
    Ok(Recorded {
        event: CompletionEvent {
            habit_id,
            owner: owner.to_string(),
            day,
        },
        inserted: inserted > 0,
    })
}

pub fn record_today(conn: &Connection, habit_id: i64, owner: &str) -> LedgerResult<Recorded> {
    record(conn, habit_id, owner, Local::now().date_naive())
}

pub fn completed_on(conn: &Connection, owner: &str, day: NaiveDate) -> LedgerResult<BTreeSet<i64>> {
    require_owner(owner)?;
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT habit_id FROM habit_completions WHERE owner = ?1 AND day = ?2",
    )?;
    let ids = stmt
        .query_map(params![owner, day], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(ids)
}

/// Total completions (not distinct days) in the inclusive range.
pub fn count_events_in_range(
    conn: &Connection,
    owner: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<u64> {
    check_range(owner, start, end)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM habit_completions WHERE owner = ?1 AND day BETWEEN ?2 AND ?3",
        params![owner, start, end],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Number of calendar days in the inclusive range with at least one completion.
pub fn count_distinct_days_in_range(
    conn: &Connection,
    owner: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<u64> {
    check_range(owner, start, end)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT day) FROM habit_completions
         WHERE owner = ?1 AND day BETWEEN ?2 AND ?3",
        params![owner, start, end],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn dates_with_activity(
    conn: &Connection,
    owner: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<BTreeSet<NaiveDate>> {
    check_range(owner, start, end)?;
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT day FROM habit_completions
         WHERE owner = ?1 AND day BETWEEN ?2 AND ?3
         ORDER BY day ASC",
    )?;
    let days = stmt
        .query_map(params![owner, start, end], |row| row.get::<_, NaiveDate>(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(days)
}

/// Every logged day for one habit, newest first.
pub fn days_for_habit(conn: &Connection, habit_id: i64, owner: &str) -> LedgerResult<Vec<NaiveDate>> {
    require_owner(owner)?;
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT day FROM habit_completions
         WHERE habit_id = ?1 AND owner = ?2
         ORDER BY day DESC",
    )?;
    let days = stmt
        .query_map(params![habit_id, owner], |row| row.get::<_, NaiveDate>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(days)
}

pub fn total_events(conn: &Connection) -> LedgerResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM habit_completions", [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}

pub fn events_on(conn: &Connection, day: NaiveDate) -> LedgerResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM habit_completions WHERE day = ?1",
        params![day],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(crate) fn delete_for_habit(conn: &Connection, habit_id: i64) -> LedgerResult<usize> {
    Ok(conn.execute(
        "DELETE FROM habit_completions WHERE habit_id = ?1",
        params![habit_id],
    )?)
}

fn check_range(owner: &str, start: NaiveDate, end: NaiveDate) -> LedgerResult<()> {
    require_owner(owner)?;
    if start > end {
        return Err(LedgerError::invalid(format!(
            "range start {start} is after end {end}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn recording_twice_keeps_one_row() {
        let conn = conn();
        let first = record(&conn, 1, "a", d("2024-01-01")).unwrap();
        let second = record(&conn, 1, "a", d("2024-01-01")).unwrap();
        assert!(first.inserted);
        assert!(!second.inserted);

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM habit_completions WHERE habit_id = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn record_today_uses_local_calendar_day() {
        let conn = conn();
        let recorded = record_today(&conn, 9, "a").unwrap();
        assert!(recorded.inserted);
        let done = completed_on(&conn, "a", recorded.event.day).unwrap();
        assert!(done.contains(&9));
    }

    #[test]
    fn distinct_days_count_once_per_day() {
        let conn = conn();
        record(&conn, 1, "a", d("2024-01-01")).unwrap();
        record(&conn, 2, "a", d("2024-01-01")).unwrap();
        record(&conn, 1, "a", d("2024-01-03")).unwrap();
        record(&conn, 3, "b", d("2024-01-02")).unwrap();

        let (start, end) = (d("2024-01-01"), d("2024-01-07"));
        assert_eq!(count_events_in_range(&conn, "a", start, end).unwrap(), 3);
        assert_eq!(count_distinct_days_in_range(&conn, "a", start, end).unwrap(), 2);
        let days: Vec<NaiveDate> = dates_with_activity(&conn, "a", start, end)
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(days, vec![d("2024-01-01"), d("2024-01-03")]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let conn = conn();
        record(&conn, 1, "a", d("2024-01-01")).unwrap();
        record(&conn, 1, "a", d("2024-01-05")).unwrap();
        assert_eq!(
            count_events_in_range(&conn, "a", d("2024-01-01"), d("2024-01-05")).unwrap(),
            2
        );
        assert_eq!(
            count_events_in_range(&conn, "a", d("2024-01-02"), d("2024-01-04")).unwrap(),
            0
        );
    }

    #[test]
    fn completed_on_is_exact_day() {
        let conn = conn();
        record(&conn, 1, "a", d("2024-01-01")).unwrap();
        record(&conn, 2, "a", d("2024-01-02")).unwrap();
        let ids = completed_on(&conn, "a", d("2024-01-02")).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        let conn = conn();
        assert!(matches!(
            record(&conn, 1, "", d("2024-01-01")),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            count_events_in_range(&conn, "a", d("2024-01-05"), d("2024-01-01")),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn days_for_habit_are_newest_first() {
        let conn = conn();
        for day in ["2024-01-02", "2024-01-04", "2024-01-01"] {
            record(&conn, 7, "a", d(day)).unwrap();
        }
        assert_eq!(
            days_for_habit(&conn, 7, "a").unwrap(),
            vec![d("2024-01-04"), d("2024-01-02"), d("2024-01-01")]
        );
        assert!(days_for_habit(&conn, 8, "a").unwrap().is_empty());
    }
}
