pub mod store;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One fulfilled occurrence of a habit on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub habit_id: i64,
    pub owner: String,
    pub day: NaiveDate,
}

/// Outcome of a `record` call; `inserted` is false when the day was already logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded {
    pub event: CompletionEvent,
    pub inserted: bool,
}
