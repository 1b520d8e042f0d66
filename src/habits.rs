use crate::completions::store::delete_for_habit;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{require_owner, with_immediate_transaction};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

/// What happens to a habit's completion history when the habit is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Completions stay for historical analytics.
    #[default]
    Retain,
    /// Completions are removed in the same transaction as the habit.
    Cascade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub short_desc: String,
    pub category_id: Option<i64>,
    pub frequency: String,
    pub active: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub owner: String,
    pub name: String,
    pub short_desc: String,
    pub category_id: Option<i64>,
    pub frequency: String,
}

impl NewHabit {
    pub fn daily(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            short_desc: String::new(),
            category_id: None,
            frequency: "daily".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub completions_removed: usize,
}

const HABIT_COLUMNS: &str =
    "id, owner, name, short_desc, category_id, frequency, active, created_at";

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        short_desc: row.get(3)?,
        category_id: row.get(4)?,
        frequency: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create(conn: &Connection, habit: &NewHabit) -> LedgerResult<i64> {
    require_owner(&habit.owner)?;
    let name = habit.name.trim();
    if name.is_empty() {
        return Err(LedgerError::invalid("habit name must not be empty"));
    }
    with_immediate_transaction(conn, |tx| {
        tx.execute(
            "INSERT INTO habits (owner, name, short_desc, category_id, frequency, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                habit.owner,
                name,
                habit.short_desc.trim(),
                habit.category_id,
                habit.frequency,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })
}

pub fn get(conn: &Connection, habit_id: i64, owner: &str) -> LedgerResult<Option<Habit>> {
    conn.query_row(
        &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND owner = ?2"),
        params![habit_id, owner],
        habit_from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_active(conn: &Connection, owner: &str) -> LedgerResult<Vec<Habit>> {
    require_owner(owner)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE owner = ?1 AND active = 1 ORDER BY id ASC"
    ))?;
    let habits = stmt
        .query_map(params![owner], habit_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(habits)
}

pub fn set_active(conn: &Connection, habit_id: i64, owner: &str, active: bool) -> LedgerResult<()> {
    let updated = with_immediate_transaction(conn, |tx| {
        Ok(tx.execute(
            "UPDATE habits SET active = ?3 WHERE id = ?1 AND owner = ?2",
            params![habit_id, owner, active],
        )?)
    })?;
    if updated == 0 {
        return Err(LedgerError::NotFound(format!(
            "habit {habit_id} for owner {owner}"
        )));
    }
    Ok(())
}

pub fn delete(
    conn: &Connection,
    habit_id: i64,
    owner: &str,
    policy: DeletePolicy,
) -> LedgerResult<DeleteOutcome> {
    require_owner(owner)?;
    with_immediate_transaction(conn, |tx| {
        let removed = tx.execute(
            "DELETE FROM habits WHERE id = ?1 AND owner = ?2",
            params![habit_id, owner],
        )?;
        if removed == 0 {
            return Err(LedgerError::NotFound(format!(
                "habit {habit_id} for owner {owner}"
            )));
        }
        let completions_removed = match policy {
            DeletePolicy::Retain => 0,
            DeletePolicy::Cascade => delete_for_habit(tx, habit_id)?,
        };
        Ok(DeleteOutcome {
            completions_removed,
        })
    })
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

    #[test]
    fn create_list_and_deactivate() {
        let conn = conn();
        let a = create(&conn, &NewHabit::daily("a", "Walk")).unwrap();
        let b = create(&conn, &NewHabit::daily("a", "Read")).unwrap();
        create(&conn, &NewHabit::daily("b", "Swim")).unwrap();

        let ids: Vec<i64> = list_active(&conn, "a").unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![a, b]);

        set_active(&conn, a, "a", false).unwrap();
        let ids: Vec<i64> = list_active(&conn, "a").unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn rejects_blank_name_and_foreign_owner() {
        let conn = conn();
        assert!(matches!(
            create(&conn, &NewHabit::daily("a", "  ")),
            Err(LedgerError::InvalidInput(_))
        ));
        let id = create(&conn, &NewHabit::daily("a", "Walk")).unwrap();
        assert!(get(&conn, id, "b").unwrap().is_none());
        assert!(matches!(
            set_active(&conn, id, "b", false),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            delete(&conn, id, "b", DeletePolicy::Cascade),
            Err(LedgerError::NotFound(_))
        ));
    }
}
