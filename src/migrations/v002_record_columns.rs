//! V002: columns on categories, habits, completions and daily progress.
//!
//! The columns V001 creates are listed again because a table that already
//! existed was left in whatever shape an older build wrote. They come first
//! so the owner backfill below can read `habits.owner`.
//!
//! `ADD COLUMN` only accepts constant defaults, so `created_at` is written by
//! the inserting code rather than defaulted.

use super::{ColumnSpec, converge};
use crate::error::LedgerResult;
use rusqlite::Connection;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        table: "categories",
        name: "name",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "habits",
        name: "owner",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "habits",
        name: "name",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "habit_completions",
        name: "habit_id",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    ColumnSpec {
        table: "habit_completions",
        name: "day",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "daily_progress",
        name: "owner",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "daily_progress",
        name: "day",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "categories",
        name: "icon",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "habits",
        name: "short_desc",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "habits",
        name: "category_id",
        definition: "INTEGER REFERENCES categories(id)",
    },
    ColumnSpec {
        table: "habits",
        name: "frequency",
        definition: "TEXT NOT NULL DEFAULT 'daily'",
    },
    ColumnSpec {
        table: "habits",
        name: "active",
        definition: "INTEGER NOT NULL DEFAULT 1",
    },
    ColumnSpec {
        table: "habits",
        name: "created_at",
        definition: "TEXT",
    },
    ColumnSpec {
        table: "habit_completions",
        name: "owner",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "daily_progress",
        name: "planned_total_max",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
];

pub fn apply(conn: &Connection) -> LedgerResult<usize> {
    let mut added = converge(conn, &[], COLUMNS, &[])?;
    if added > 0 {
        // Completions written before `owner` existed inherit it from their habit.
        added += conn.execute(
            "UPDATE habit_completions
             SET owner = (SELECT h.owner FROM habits h WHERE h.id = habit_completions.habit_id)
             WHERE owner = ''
               AND EXISTS (SELECT 1 FROM habits h WHERE h.id = habit_completions.habit_id)",
            [],
        )?;
    }
    Ok(added)
}
