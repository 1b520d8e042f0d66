use super::{ColumnSpec, converge};
use crate::error::LedgerResult;
use rusqlite::Connection;

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        table: "users",
        name: "email",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "users",
        name: "name",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnSpec {
        table: "users",
        name: "role",
        definition: "TEXT NOT NULL DEFAULT 'user'",
    },
    ColumnSpec {
        table: "users",
        name: "password_hash",
        definition: "TEXT",
    },
    ColumnSpec {
        table: "users",
        name: "created_at",
        definition: "TEXT",
    },
];

pub fn apply(conn: &Connection) -> LedgerResult<usize> {
    converge(conn, &[], COLUMNS, &[])
}
