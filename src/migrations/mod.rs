//! Additive schema convergence.
//!
//! Steps run in order on every startup and each one is idempotent on its own:
//! tables first, then columns, then indexes, then data fix-ups. Nothing is
//! ever dropped or renamed. `PRAGMA user_version` records the highest step
//! that has completed so far.

pub mod v001_core_tables;
pub mod v002_record_columns;
pub mod v003_user_columns;
pub mod v004_indexes;
pub mod v005_credentials;

use crate::error::{LedgerError, LedgerResult};
use crate::storage::with_immediate_transaction;
use rusqlite::{Connection, params};

/// A table created with its minimal shape when absent.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
}

/// A column added with `ALTER TABLE ... ADD COLUMN` when absent.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub table: &'static str,
    pub name: &'static str,
    pub definition: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

pub struct MigrationStep {
    pub version: u32,
    pub name: &'static str,
    /// Returns how many objects or rows the step changed.
    pub apply: fn(&Connection) -> LedgerResult<usize>,
}

pub const STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: 1,
        name: "v001_core_tables",
        apply: v001_core_tables::apply,
    },
    MigrationStep {
        version: 2,
        name: "v002_record_columns",
        apply: v002_record_columns::apply,
    },
    MigrationStep {
        version: 3,
        name: "v003_user_columns",
        apply: v003_user_columns::apply,
    },
    MigrationStep {
        version: 4,
        name: "v004_indexes",
        apply: v004_indexes::apply,
    },
    MigrationStep {
        version: 5,
        name: "v005_credentials",
        apply: v005_credentials::apply,
    },
];

/// Converges the schema. A failing step rolls back alone and is reported as
/// `SchemaInconsistent` (lock contention passes through unchanged so callers
/// can retry); the next startup re-runs every step from the top.
pub fn run_migrations(conn: &Connection) -> LedgerResult<()> {
    run_steps(conn, STEPS)
}

fn run_steps(conn: &Connection, steps: &[MigrationStep]) -> LedgerResult<()> {
    for step in steps {
        let changed = with_immediate_transaction(conn, |tx| {
            let changed = (step.apply)(tx)?;
            if current_version(tx)? < step.version {
                tx.pragma_update(None, "user_version", step.version)?;
            }
            Ok(changed)
        })
        .map_err(|err| {
            if err.is_transient() {
                err
            } else {
                LedgerError::SchemaInconsistent {
                    step: step.name.to_string(),
                    message: err.to_string(),
                }
            }
        })?;
        if changed > 0 {
            tracing::info!(step = step.name, changed, "applied migration step");
        }
    }
    Ok(())
}

/// Applies table, then column, then index specs. Returns how many objects
/// were created.
pub fn converge(
    conn: &Connection,
    tables: &[TableSpec],
    columns: &[ColumnSpec],
    indexes: &[IndexSpec],
) -> LedgerResult<usize> {
    let mut created = 0;
    for table in tables {
        created += usize::from(ensure_table(conn, table)?);
    }
    for column in columns {
        created += usize::from(ensure_column(conn, column)?);
    }
    for index in indexes {
        created += usize::from(ensure_index(conn, index)?);
    }
    Ok(created)
}

pub fn current_version(conn: &Connection) -> LedgerResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Sorted DDL of every user object, for comparing schema state.
pub fn schema_snapshot(conn: &Connection) -> LedgerResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT type || ':' || name || ':' || COALESCE(sql, '')
         FROM sqlite_master
         WHERE name NOT LIKE 'sqlite_%'
         ORDER BY type, name",
    )?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn table_exists(conn: &Connection, table: &str) -> LedgerResult<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

pub fn table_columns(conn: &Connection, table: &str) -> LedgerResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let cols = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cols)
}

pub fn index_exists(conn: &Connection, index: &str) -> LedgerResult<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
        params![index],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

pub fn ensure_table(conn: &Connection, spec: &TableSpec) -> LedgerResult<bool> {
    if table_exists(conn, spec.name)? {
        return Ok(false);
    }
    conn.execute_batch(spec.create_sql)?;
    tracing::debug!(table = spec.name, "created table");
    Ok(true)
}

pub fn ensure_column(conn: &Connection, spec: &ColumnSpec) -> LedgerResult<bool> {
    check_ident(spec.table)?;
    check_ident(spec.name)?;
    if table_columns(conn, spec.table)?
        .iter()
        .any(|c| c.eq_ignore_ascii_case(spec.name))
    {
        return Ok(false);
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        spec.table, spec.name, spec.definition
    ))?;
    tracing::debug!(table = spec.table, column = spec.name, "added column");
    Ok(true)
}

/// Creates the index unless it exists. When any of its columns is still
/// missing the request is skipped and picked up on a later startup.
pub fn ensure_index(conn: &Connection, spec: &IndexSpec) -> LedgerResult<bool> {
    check_ident(spec.name)?;
    check_ident(spec.table)?;
    for col in spec.columns {
        check_ident(col)?;
    }
    if index_exists(conn, spec.name)? {
        return Ok(false);
    }
    let existing = table_columns(conn, spec.table)?;
    let missing: Vec<&str> = spec
        .columns
        .iter()
        .copied()
        .filter(|col| !existing.iter().any(|c| c.eq_ignore_ascii_case(col)))
        .collect();
    if !missing.is_empty() {
        tracing::debug!(
            index = spec.name,
            missing = ?missing,
            "skipping index until its columns exist"
        );
        return Ok(false);
    }
    let unique = if spec.unique { "UNIQUE " } else { "" };
    conn.execute_batch(&format!(
        "CREATE {unique}INDEX {} ON {}({})",
        spec.name,
        spec.table,
        spec.columns.join(", ")
    ))?;
    tracing::debug!(index = spec.name, "created index");
    Ok(true)
}

/// Copies values forward from legacy columns into `target` for rows where
/// `target` is still NULL or empty, passing each value through `transform`.
/// Candidates are tried in order; absent ones are ignored.
pub fn backfill_legacy<F>(
    conn: &Connection,
    table: &str,
    candidate_source_columns: &[&str],
    target_column: &str,
    transform: F,
) -> LedgerResult<usize>
where
    F: Fn(&str) -> String,
{
    check_ident(table)?;
    check_ident(target_column)?;
    let existing = table_columns(conn, table)?;
    if !existing.iter().any(|c| c == target_column) {
        return Err(LedgerError::invalid(format!(
            "backfill target {table}.{target_column} does not exist"
        )));
    }

    let mut changed = 0;
    for source in candidate_source_columns {
        check_ident(source)?;
        if *source == target_column || !existing.iter().any(|c| c == source) {
            continue;
        }
        let pending: Vec<(i64, String)> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT rowid, {source} FROM {table}
                 WHERE ({target_column} IS NULL OR {target_column} = '')
                   AND {source} IS NOT NULL AND {source} != ''"
            ))?;
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        let mut update = conn.prepare(&format!(
            "UPDATE {table} SET {target_column} = ?2 WHERE rowid = ?1"
        ))?;
        for (rowid, legacy_value) in pending {
            changed += update.execute(params![rowid, transform(&legacy_value)])?;
        }
    }
    Ok(changed)
}

/// Assigns `default_value_factory()` to `target_column` on every row that
/// matches `missing_predicate`, an SQL boolean expression over the table.
/// The predicate is spliced into the statement as-is, so callers pass
/// constants only.
pub(crate) fn ensure_defaults<F>(
    conn: &Connection,
    table: &str,
    missing_predicate: &str,
    target_column: &str,
    mut default_value_factory: F,
) -> LedgerResult<usize>
where
    F: FnMut() -> String,
{
    check_ident(table)?;
    check_ident(target_column)?;
    let rowids: Vec<i64> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT rowid FROM {table} WHERE {missing_predicate}"
        ))?;
        stmt.query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    let mut update = conn.prepare(&format!(
        "UPDATE {table} SET {target_column} = ?2 WHERE rowid = ?1"
    ))?;
    let mut changed = 0;
    for rowid in rowids {
        changed += update.execute(params![rowid, default_value_factory()])?;
    }
    Ok(changed)
}

fn check_ident(ident: &str) -> LedgerResult<()> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(LedgerError::invalid(format!("bad SQL identifier `{ident}`")))
    }
}
