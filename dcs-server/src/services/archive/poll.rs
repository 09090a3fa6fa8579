//! Waiting for an ingestion record to settle
//!
//! Fixed-interval retry with a cap on attempts. Not a backoff.

use dcs_common::model::IngestRecord;
use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::db;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Deposit not found: {0}")]
    NotFound(Uuid),

    /// Gave up; carries the last record seen
    #[error("Deposit {} still {} after {attempts} attempts", .last.deposit_id, .last.status)]
    TimedOut { attempts: u32, last: Box<IngestRecord> },

    #[error(transparent)]
    Database(#[from] dcs_common::Error),
}

/// Re-read the record every `interval` until it is DEPOSITED or FAILED
///
/// The first read happens immediately. `max_attempts` counts reads, so at
/// most `max_attempts - 1` sleeps occur.
pub async fn poll_until_complete(
    pool: &SqlitePool,
    deposit_id: Uuid,
    interval: Duration,
    max_attempts: u32,
) -> Result<IngestRecord, PollError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let record = db::ingest::load_record(pool, deposit_id)
            .await?
            .ok_or(PollError::NotFound(deposit_id))?;

        if record.status.is_terminal() {
            debug!(deposit_id = %deposit_id, attempt, status = %record.status, "Deposit settled");
            return Ok(record);
        }

        if attempt >= max_attempts {
            return Err(PollError::TimedOut {
                attempts: attempt,
                last: Box::new(record),
            });
        }

        tokio::time::sleep(interval).await;
    }
}
