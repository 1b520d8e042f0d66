pub mod analytics;
pub mod cli;
pub mod commands;
pub mod completions;
pub mod config;
pub mod error;
pub mod habits;
pub mod ledger;
pub mod logging;
pub mod migrations;
pub mod storage;
pub mod users;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{CompletionOutcome, Ledger};
