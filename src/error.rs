use rusqlite::ErrorCode;
use thiserror::Error;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage busy: write did not complete after {attempts} attempt(s)")]
    StorageBusy { attempts: u32 },

    #[error("schema step `{step}` failed: {message}")]
    SchemaInconsistent { step: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("sqlite: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for lock contention that a later attempt may get past.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
