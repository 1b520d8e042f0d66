use crate::error::{LedgerError, LedgerResult};
use crate::storage::with_immediate_transaction;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Credential assigned to accounts that reach the credentials step with no
/// password at all.
pub const PLACEHOLDER_PASSWORD: &str = "changeme";

const HASH_SCHEME: &str = "sha256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    fn parse(raw: &str) -> Self {
        if raw == "admin" { Role::Admin } else { Role::User }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: Option<String>,
}

/// Salted SHA-256 in the form `sha256$<salt>$<hex digest>`.
pub fn hash_password(plain: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{HASH_SCHEME}${salt}${}", digest(&salt, plain))
}

pub fn verify_password(stored: &str, plain: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_SCHEME), Some(salt), Some(hex)) => digest(salt, plain) == hex,
        _ => false,
    }
}

fn digest(salt: &str, plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn create_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> LedgerResult<i64> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(LedgerError::invalid("email must not be empty"));
    }
    with_immediate_transaction(conn, |tx| {
        tx.execute(
            "INSERT INTO users (email, name, role, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                email,
                name.trim(),
                role.as_str(),
                hash_password(password),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })
}

pub fn get_by_email(conn: &Connection, email: &str) -> LedgerResult<Option<User>> {
    conn.query_row(
        "SELECT id, email, name, role, password_hash FROM users WHERE email = ?1",
        params![email.trim().to_lowercase()],
        |row| {
            let role: String = row.get(3)?;
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                role: Role::parse(&role),
                password_hash: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

pub fn authenticate(conn: &Connection, email: &str, password: &str) -> LedgerResult<Option<User>> {
    Ok(get_by_email(conn, email)?.filter(|user| {
        user.password_hash
            .as_deref()
            .is_some_and(|stored| verify_password(stored, password))
    }))
}
