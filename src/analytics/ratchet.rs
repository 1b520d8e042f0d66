//! Per-owner, per-day planned-habit high-water mark.
//!
//! The stored value is set on the first observation of a day and only ever
//! raised afterwards, so deleting a habit mid-day never shrinks the
//! denominator of the day's percentage.

use crate::error::LedgerResult;
use crate::storage::{require_owner, with_immediate_transaction};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

pub fn ensure_and_get_planned_max(
    conn: &Connection,
    owner: &str,
    day: NaiveDate,
    current_active_count: u32,
) -> LedgerResult<u32> {
    require_owner(owner)?;
    with_immediate_transaction(conn, |tx| {
        tx.execute(
            "INSERT INTO daily_progress (owner, day, planned_total_max) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner, day) DO UPDATE
             SET planned_total_max = MAX(planned_total_max, excluded.planned_total_max)",
            params![owner, day, current_active_count],
        )?;
        let stored: u32 = tx.query_row(
            "SELECT planned_total_max FROM daily_progress WHERE owner = ?1 AND day = ?2",
            params![owner, day],
            |row| row.get(0),
        )?;
        Ok(stored)
    })
}

/// Stored value without creating a row.
pub fn planned_max(conn: &Connection, owner: &str, day: NaiveDate) -> LedgerResult<Option<u32>> {
    conn.query_row(
        "SELECT planned_total_max FROM daily_progress WHERE owner = ?1 AND day = ?2",
        params![owner, day],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}
