//! V004: lookup indexes and the uniqueness guarantees the completion log and
//! the planned-max ratchet rely on.
//!
//! Databases from before the unique indexes may hold duplicates; those are
//! folded first so index creation cannot fail on existing data.

use super::{IndexSpec, converge, index_exists};
use crate::error::LedgerResult;
use rusqlite::Connection;

pub const INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: "idx_habit_completions_habit_day",
        table: "habit_completions",
        columns: &["habit_id", "day"],
        unique: true,
    },
    IndexSpec {
        name: "idx_habit_completions_owner_day",
        table: "habit_completions",
        columns: &["owner", "day"],
        unique: false,
    },
    IndexSpec {
        name: "idx_daily_progress_owner_day",
        table: "daily_progress",
        columns: &["owner", "day"],
        unique: true,
    },
    IndexSpec {
        name: "idx_habits_owner_active",
        table: "habits",
        columns: &["owner", "active"],
        unique: false,
    },
];

pub fn apply(conn: &Connection) -> LedgerResult<usize> {
    let mut changed = 0;
    if !index_exists(conn, "idx_habit_completions_habit_day")? {
        changed += conn.execute(
            "DELETE FROM habit_completions
             WHERE id NOT IN (SELECT MIN(id) FROM habit_completions GROUP BY habit_id, day)",
            [],
        )?;
    }
    if !index_exists(conn, "idx_daily_progress_owner_day")? {
        changed += conn.execute(
            "UPDATE daily_progress
             SET planned_total_max = (
                 SELECT MAX(d.planned_total_max) FROM daily_progress d
                 WHERE d.owner = daily_progress.owner AND d.day = daily_progress.day
             )",
            [],
        )?;
        changed += conn.execute(
            "DELETE FROM daily_progress
             WHERE id NOT IN (SELECT MIN(id) FROM daily_progress GROUP BY owner, day)",
            [],
        )?;
    }
    changed += converge(conn, &[], &[], INDEXES)?;
    Ok(changed)
}
