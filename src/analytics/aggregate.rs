//! Roll-ups consumed by the progress panel, calendar views and the admin
//! dashboard.

use crate::completions::store::{
    count_distinct_days_in_range, count_events_in_range, dates_with_activity, events_on,
    total_events,
};
use crate::error::LedgerResult;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelProgress {
    pub completed: u32,
    pub total: u32,
    pub planned_total_max: u32,
    pub percent: u8,
}

/// Whole-number share of `completed` over `planned`, clamped to `0..=100`.
pub fn percent_complete(completed: u32, planned: u32) -> u8 {
    if planned == 0 {
        return 0;
    }
    let pct = u64::from(completed) * 100 / u64::from(planned);
    pct.min(100) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days_active: u64,
    pub events: u64,
    pub distinct_completion_dates: Vec<NaiveDate>,
}

pub fn window_stats(
    conn: &Connection,
    owner: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<WindowStats> {
    let days_active = count_distinct_days_in_range(conn, owner, start, end)?;
    let events = count_events_in_range(conn, owner, start, end)?;
    let distinct_completion_dates = dates_with_activity(conn, owner, start, end)?
        .into_iter()
        .collect();
    Ok(WindowStats {
        start,
        end,
        days_active,
        events,
        distinct_completion_dates,
    })
}

/// Fraction of planned habit-days fulfilled, in `[0, 1]`.
pub fn completion_rate(events: u64, active_habits: u32, window_days: u32) -> f64 {
    let possible = u64::from(active_habits) * u64::from(window_days);
    if possible == 0 {
        return 0.0;
    }
    (events as f64 / possible as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_users: u64,
    pub admin_count: u64,
    pub total_habits: u64,
    pub active_habits: u64,
    pub total_completions: u64,
    pub completions_today: u64,
}

pub fn system_stats(conn: &Connection, today: NaiveDate) -> LedgerResult<SystemStats> {
    let count = |sql: &str| -> LedgerResult<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };
    Ok(SystemStats {
        total_users: count("SELECT COUNT(*) FROM users")?,
        admin_count: count("SELECT COUNT(*) FROM users WHERE role = 'admin'")?,
        total_habits: count("SELECT COUNT(*) FROM habits")?,
        active_habits: count("SELECT COUNT(*) FROM habits WHERE active = 1")?,
        total_completions: total_events(conn)?,
        completions_today: events_on(conn, today)?,
    })
}
