//! Login sessions
//!
//! Only the SHA-256 digest of each token is stored. Expiry is kept as epoch
//! milliseconds so it can be compared in SQL.

use chrono::{DateTime, Duration, Utc};
use dcs_common::api::auth::{generate_session_token, hash_session_token};
use dcs_common::time;
use dcs_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::parse_uuid;

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_session(
    pool: &SqlitePool,
    person_id: Uuid,
    lifetime: Duration,
) -> Result<IssuedSession> {
    let token = generate_session_token();
    let now = time::now();
    let expires_at = now + lifetime;

    sqlx::query(
        "INSERT INTO sessions (token_hash, person_id, created_at, expires_at_ms) VALUES (?, ?, ?, ?)",
    )
    .bind(hash_session_token(&token))
    .bind(person_id.to_string())
    .bind(time::to_db(&now))
    .bind(expires_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(IssuedSession { token, expires_at })
}

/// Resolve a token to its person id; expired sessions resolve to None
pub async fn lookup_session(pool: &SqlitePool, token: &str) -> Result<Option<Uuid>> {
    let person_id: Option<String> = sqlx::query_scalar(
        "SELECT person_id FROM sessions WHERE token_hash = ? AND expires_at_ms > ?",
    )
    .bind(hash_session_token(token))
    .bind(time::now().timestamp_millis())
    .fetch_optional(pool)
    .await?;

    person_id.map(|id| parse_uuid("session person", &id)).transpose()
}

/// Delete one session; false if it did not exist
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_session_token(token))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop every session belonging to a person
pub async fn delete_sessions_for(pool: &SqlitePool, person_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE person_id = ?")
        .bind(person_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at_ms <= ?")
        .bind(time::now().timestamp_millis())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
