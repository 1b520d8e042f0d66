//! V005: every user ends up with a password hash. Plaintext values left in
//! legacy columns are hashed forward; anyone still without a hash gets the
//! hash of the placeholder credential and must reset it.

use super::{backfill_legacy, ensure_defaults};
use crate::error::LedgerResult;
use crate::users::{PLACEHOLDER_PASSWORD, hash_password};
use rusqlite::Connection;

pub const LEGACY_PASSWORD_COLUMNS: &[&str] = &["password", "plain_password"];

pub fn apply(conn: &Connection) -> LedgerResult<usize> {
    let backfilled = backfill_legacy(
        conn,
        "users",
        LEGACY_PASSWORD_COLUMNS,
        "password_hash",
        hash_password,
    )?;
    let defaulted = ensure_defaults(
        conn,
        "users",
        "password_hash IS NULL OR password_hash = ''",
        "password_hash",
        || hash_password(PLACEHOLDER_PASSWORD),
    )?;
    if defaulted > 0 {
        tracing::warn!(
            users = defaulted,
            "assigned placeholder credentials to users without a password"
        );
    }
    Ok(backfilled + defaulted)
}
