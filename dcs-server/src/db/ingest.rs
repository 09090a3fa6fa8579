//! Archive ingestion records
//!
//! The worker claims PENDING records by flipping them to INGESTING with a
//! conditional UPDATE, so two workers never process the same record.

use dcs_common::db::{get_setting, retry_on_lock};
use dcs_common::db::retry::MAX_LOCK_WAIT_SETTING;
use dcs_common::model::{IngestRecord, IngestStatus};
use dcs_common::time;
use dcs_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

const RECORD_COLUMNS: &str =
    "deposit_id, object_type, object_id, status, message, du_id, created_at, updated_at";

pub async fn insert_record(conn: &mut SqliteConnection, record: &IngestRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ingest_records (
            deposit_id, object_type, object_id, status, message, du_id, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.deposit_id.to_string())
    .bind(record.object_type.as_str())
    .bind(record.object_id.to_string())
    .bind(record.status.as_str())
    .bind(&record.message)
    .bind(&record.du_id)
    .bind(time::to_db(&record.created_at))
    .bind(time::to_db(&record.updated_at))
    .execute(conn)
    .await?;
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<IngestRecord> {
    let deposit_id: String = row.get("deposit_id");
    let object_type: String = row.get("object_type");
    let object_id: String = row.get("object_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(IngestRecord {
        deposit_id: parse_uuid("deposit", &deposit_id)?,
        object_type: object_type.parse()?,
        object_id: parse_uuid("object", &object_id)?,
        status: status.parse()?,
        message: row.get("message"),
        du_id: row.get("du_id"),
        created_at: time::from_db("created_at", &created_at)?,
        updated_at: time::from_db("updated_at", &updated_at)?,
    })
}

pub async fn load_record(pool: &SqlitePool, deposit_id: Uuid) -> Result<Option<IngestRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ingest_records WHERE deposit_id = ?",
        RECORD_COLUMNS
    ))
    .bind(deposit_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// All records for one business object, newest first
pub async fn records_for_object(pool: &SqlitePool, object_id: Uuid) -> Result<Vec<IngestRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM ingest_records WHERE object_id = ? ORDER BY created_at DESC",
        RECORD_COLUMNS
    ))
    .bind(object_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Claim up to `limit` pending records, oldest first
pub async fn claim_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<IngestRecord>> {
    let candidates: Vec<String> = sqlx::query_scalar(
        "SELECT deposit_id FROM ingest_records WHERE status = ? ORDER BY created_at LIMIT ?",
    )
    .bind(IngestStatus::Pending.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let max_wait_ms: u64 = get_setting(pool, MAX_LOCK_WAIT_SETTING, 5000).await?;
    let mut claimed = Vec::with_capacity(candidates.len());

    for deposit_id in candidates {
        let now = time::to_db(&time::now());
        let rows = retry_on_lock("claim_pending", max_wait_ms, || async {
            let result = sqlx::query(
                "UPDATE ingest_records SET status = ?, updated_at = ? \
                 WHERE deposit_id = ? AND status = ?",
            )
            .bind(IngestStatus::Ingesting.as_str())
            .bind(&now)
            .bind(&deposit_id)
            .bind(IngestStatus::Pending.as_str())
            .execute(pool)
            .await
            .map_err(Error::Database)?;
            Ok(result.rows_affected())
        })
        .await?;

        if rows == 1 {
            if let Some(record) = load_record(pool, parse_uuid("deposit", &deposit_id)?).await? {
                claimed.push(record);
            }
        }
    }

    Ok(claimed)
}

/// Move a record to a terminal state
pub async fn finish_record(
    pool: &SqlitePool,
    deposit_id: Uuid,
    status: IngestStatus,
    du_id: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    if !status.is_terminal() {
        return Err(Error::Internal(format!(
            "finish_record called with non-terminal status {}",
            status
        )));
    }

    let max_wait_ms: u64 = get_setting(pool, MAX_LOCK_WAIT_SETTING, 5000).await?;
    let deposit_id = deposit_id.to_string();
    let now = time::to_db(&time::now());

    retry_on_lock("finish_record", max_wait_ms, || async {
        sqlx::query(
            "UPDATE ingest_records SET status = ?, du_id = ?, message = ?, updated_at = ? \
             WHERE deposit_id = ?",
        )
        .bind(status.as_str())
        .bind(du_id)
        .bind(message)
        .bind(&now)
        .bind(&deposit_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    })
    .await
}

/// Hand a claimed record back to the queue
pub async fn release_claim(pool: &SqlitePool, deposit_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE ingest_records SET status = ?, updated_at = ? \
         WHERE deposit_id = ? AND status = ?",
    )
    .bind(IngestStatus::Pending.as_str())
    .bind(time::to_db(&time::now()))
    .bind(deposit_id.to_string())
    .bind(IngestStatus::Ingesting.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Return records stranded in INGESTING (after a crash) to PENDING
pub async fn reset_interrupted(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE ingest_records SET status = ?, updated_at = ? WHERE status = ?",
    )
    .bind(IngestStatus::Pending.as_str())
    .bind(time::to_db(&time::now()))
    .bind(IngestStatus::Ingesting.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Count of records per status (health/diagnostics)
pub async fn count_by_status(pool: &SqlitePool, status: IngestStatus) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingest_records WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
