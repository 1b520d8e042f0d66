//! SQLite handle: engine pragmas, per-connection settings, write transactions.
//!
//! Every thread or process opens its own connection through [`Database::connect`].
//! WAL mode lets readers proceed while one writer holds the lock; a blocked
//! writer waits up to the busy timeout instead of failing immediately.

pub mod retry;

use crate::error::{LedgerError, LedgerResult};
use crate::migrations;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub busy_timeout: Duration,
    pub cache_size_kib: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(30),
            cache_size_kib: 8_000,
        }
    }
}

/// Per-file gate; `true` once engine pragmas and schema convergence have run
/// for that file in this process.
type FileGate = Arc<Mutex<bool>>;

fn file_gate(path: &Path) -> FileGate {
    static GATES: OnceLock<Mutex<HashMap<PathBuf, FileGate>>> = OnceLock::new();
    let mut gates = GATES
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(gates.entry(path.to_path_buf()).or_default())
}

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    settings: StorageSettings,
}

impl Database {
    /// Startup step: switch the file to WAL and converge the schema.
    ///
    /// Runs at most once per file per process; later calls only build the handle.
    pub fn initialize(path: &Path, settings: StorageSettings) -> LedgerResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let path = std::path::absolute(path)?;
        let db = Self { path, settings };

        // Only callers for the same file wait on each other here.
        let gate = file_gate(&db.path);
        let mut ready = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !*ready {
            let conn = db.connect()?;
            apply_engine_pragmas(&conn)?;
            migrations::run_migrations(&conn)?;
            tracing::info!(path = %db.path.display(), "ledger database ready");
            *ready = true;
        }
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Opens a fresh connection with the per-connection pragmas applied.
    pub fn connect(&self) -> LedgerResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.settings.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -i64::from(self.settings.cache_size_kib))?;
        Ok(conn)
    }
}

/// File-level pragmas; `journal_mode` persists in the database header.
fn apply_engine_pragmas(conn: &Connection) -> LedgerResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}

pub fn journal_mode(conn: &Connection) -> LedgerResult<String> {
    let mode: String = conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
    Ok(mode.to_ascii_lowercase())
}

/// Runs `f` inside `BEGIN IMMEDIATE` so the write lock is taken up front;
/// the transaction rolls back if `f` fails.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> LedgerResult<T>
where
    F: FnOnce(&Transaction<'_>) -> LedgerResult<T>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

pub(crate) fn require_owner(owner: &str) -> LedgerResult<()> {
    if owner.trim().is_empty() {
        return Err(LedgerError::invalid("owner must not be empty"));
    }
    Ok(())
}
