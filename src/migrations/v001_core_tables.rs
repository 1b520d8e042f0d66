//! V001: core tables in their minimal shape. Later steps add the remaining
//! columns so that databases created by older builds converge the same way.

use super::{TableSpec, converge};
use crate::error::LedgerResult;
use rusqlite::Connection;

pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "users",
        create_sql: "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE
        )",
    },
    TableSpec {
        name: "categories",
        create_sql: "CREATE TABLE categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
    },
    TableSpec {
        name: "habits",
        create_sql: "CREATE TABLE habits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            name TEXT NOT NULL
        )",
    },
    TableSpec {
        name: "habit_completions",
        create_sql: "CREATE TABLE habit_completions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id INTEGER NOT NULL,
            day TEXT NOT NULL
        )",
    },
    TableSpec {
        name: "daily_progress",
        create_sql: "CREATE TABLE daily_progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            day TEXT NOT NULL
        )",
    },
];

pub fn apply(conn: &Connection) -> LedgerResult<usize> {
    converge(conn, TABLES, &[], &[])
}
