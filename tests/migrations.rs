use habitledger::analytics::ratchet::ensure_and_get_planned_max;
use habitledger::completions::store::{days_for_habit, record};
use habitledger::migrations::{
    STEPS, current_version, index_exists, run_migrations, schema_snapshot, table_columns,
};
use habitledger::storage::{Database, StorageSettings, journal_mode};
use habitledger::users::{PLACEHOLDER_PASSWORD, authenticate, verify_password};
use rusqlite::Connection;
use std::path::Path;
use tempfile::tempdir;

/// Shape written by builds that predate credentials, ownership on
/// completions and the uniqueness indexes.
fn write_legacy_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             email TEXT NOT NULL UNIQUE,
             password TEXT
         );
         CREATE TABLE habits (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             owner TEXT NOT NULL,
             name TEXT NOT NULL
         );
         CREATE TABLE habit_completions (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             habit_id INTEGER NOT NULL,
             day TEXT NOT NULL
         );
         CREATE TABLE daily_progress (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             owner TEXT NOT NULL,
             day TEXT NOT NULL
         );
         INSERT INTO users (email, password) VALUES ('demo@habitgain.local', 'demo123');
         INSERT INTO users (email, password) VALUES ('nopass@habitgain.local', NULL);
         INSERT INTO habits (owner, name) VALUES ('demo@habitgain.local', 'Walk');
         INSERT INTO habit_completions (habit_id, day) VALUES (1, '2024-01-01');
         INSERT INTO habit_completions (habit_id, day) VALUES (1, '2024-01-01');
         INSERT INTO habit_completions (habit_id, day) VALUES (1, '2024-01-02');
         INSERT INTO daily_progress (owner, day) VALUES ('demo@habitgain.local', '2024-01-01');
         INSERT INTO daily_progress (owner, day) VALUES ('demo@habitgain.local', '2024-01-01');",
    )
    .unwrap();
}

#[test]
fn fresh_database_converges_to_latest_version() {
    let tmp = tempdir().unwrap();
    let db = Database::initialize(&tmp.path().join("ledger.db"), StorageSettings::default())
        .unwrap();
    let conn = db.connect().unwrap();

    let latest = STEPS.last().unwrap().version;
    assert_eq!(current_version(&conn).unwrap(), latest);
    assert_eq!(journal_mode(&conn).unwrap(), "wal");
    for index in [
        "idx_habit_completions_habit_day",
        "idx_habit_completions_owner_day",
        "idx_daily_progress_owner_day",
        "idx_habits_owner_active",
    ] {
        assert!(index_exists(&conn, index).unwrap(), "missing {index}");
    }
}

#[test]
fn rerunning_migrations_leaves_schema_unchanged() {
    let tmp = tempdir().unwrap();
    let db = Database::initialize(&tmp.path().join("ledger.db"), StorageSettings::default())
        .unwrap();
    let conn = db.connect().unwrap();
    let before = schema_snapshot(&conn).unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(schema_snapshot(&conn).unwrap(), before);
}

#[test]
fn legacy_database_is_upgraded_in_place() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("legacy.db");
    write_legacy_db(&path);

    let db = Database::initialize(&path, StorageSettings::default()).unwrap();
    let conn = db.connect().unwrap();

    let user_cols = table_columns(&conn, "users").unwrap();
    for col in ["name", "role", "password_hash", "created_at", "password"] {
        assert!(user_cols.iter().any(|c| c == col), "users.{col} missing");
    }
    let completion_cols = table_columns(&conn, "habit_completions").unwrap();
    assert!(completion_cols.iter().any(|c| c == "owner"));
    assert!(table_columns(&conn, "daily_progress")
        .unwrap()
        .iter()
        .any(|c| c == "planned_total_max"));

    assert!(authenticate(&conn, "demo@habitgain.local", "demo123")
        .unwrap()
        .is_some());
    let placeholder: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE email = 'nopass@habitgain.local'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(verify_password(&placeholder, PLACEHOLDER_PASSWORD));

    let owner_days = days_for_habit(&conn, 1, "demo@habitgain.local").unwrap();
    assert_eq!(owner_days.len(), 2);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM habit_completions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
    let progress_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM daily_progress", [], |row| row.get(0))
        .unwrap();
    assert_eq!(progress_rows, 1);
}

#[test]
fn upgraded_database_enforces_new_guarantees() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("legacy.db");
    write_legacy_db(&path);
    let db = Database::initialize(&path, StorageSettings::default()).unwrap();
    let conn = db.connect().unwrap();

    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let again = record(&conn, 1, "demo@habitgain.local", day).unwrap();
    assert!(!again.inserted);

    let jan1 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(
        ensure_and_get_planned_max(&conn, "demo@habitgain.local", jan1, 2).unwrap(),
        2
    );
    assert_eq!(
        ensure_and_get_planned_max(&conn, "demo@habitgain.local", jan1, 1).unwrap(),
        2
    );
}

#[test]
fn upgraded_schema_is_stable_across_restarts() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("legacy.db");
    write_legacy_db(&path);
    let db = Database::initialize(&path, StorageSettings::default()).unwrap();
    let conn = db.connect().unwrap();
    let hashes_before: Vec<String> = conn
        .prepare("SELECT password_hash FROM users ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    let snapshot = schema_snapshot(&conn).unwrap();

    run_migrations(&conn).unwrap();

    let hashes_after: Vec<String> = conn
        .prepare("SELECT password_hash FROM users ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(hashes_before, hashes_after);
    assert_eq!(schema_snapshot(&conn).unwrap(), snapshot);
}

#[test]
fn habits_table_without_owner_still_converges() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("ownerless.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE habits (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 name TEXT NOT NULL,
                 frequency TEXT,
                 short_desc TEXT,
                 category_id INTEGER,
                 created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
             );
             CREATE TABLE habit_completions (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 habit_id INTEGER NOT NULL,
                 day TEXT NOT NULL
             );
             CREATE TABLE daily_progress (id INTEGER PRIMARY KEY AUTOINCREMENT);
             INSERT INTO habits (name, frequency) VALUES ('Walk', 'daily');
             INSERT INTO habit_completions (habit_id, day) VALUES (1, '2024-01-01');",
        )
        .unwrap();
    }

    let db = Database::initialize(&path, StorageSettings::default()).unwrap();
    let conn = db.connect().unwrap();
    assert_eq!(current_version(&conn).unwrap(), STEPS.last().unwrap().version);
    for (table, col) in [
        ("habits", "owner"),
        ("habits", "active"),
        ("habit_completions", "owner"),
        ("daily_progress", "owner"),
        ("daily_progress", "day"),
        ("daily_progress", "planned_total_max"),
    ] {
        assert!(
            table_columns(&conn, table).unwrap().iter().any(|c| c == col),
            "{table}.{col} missing"
        );
    }
    assert!(index_exists(&conn, "idx_daily_progress_owner_day").unwrap());

    let before = schema_snapshot(&conn).unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(schema_snapshot(&conn).unwrap(), before);
}
