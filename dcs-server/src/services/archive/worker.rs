//! Background archive ingestion
//!
//! Every `interval` the worker claims up to `batch_size` PENDING records,
//! packages the referenced object and hands it to the [`ArchiveStore`].
//! Success stores the DeliverableUnit id and marks the record DEPOSITED;
//! any failure marks it FAILED with a message.

use dcs_common::model::{IngestRecord, IngestStatus, ObjectType};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::store::{ArchivePackage, ArchiveStore, PackageFile};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::{bop, deposit};

pub struct ArchiveWorker {
    db: SqlitePool,
    store: Arc<dyn ArchiveStore>,
    interval: Duration,
    batch_size: i64,
}

impl ArchiveWorker {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn ArchiveStore>,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            db,
            store,
            interval,
            batch_size: batch_size.max(1),
        }
    }

    /// Start the polling loop on the runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Poll until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        match db::ingest::reset_interrupted(&self.db).await {
            Ok(0) => {}
            Ok(n) => warn!(records = n, "Requeued deposits interrupted by a previous shutdown"),
            Err(e) => error!(error = %e, "Failed to requeue interrupted deposits"),
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Archive worker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            if let Err(e) = self.process_pending().await {
                error!(error = %e, "Archive worker pass failed");
            }
        }

        info!("Archive worker stopped");
    }

    /// One pass: claim and process a batch. Returns the number settled.
    ///
    /// A record whose final status cannot be written is released back to
    /// PENDING so a later pass picks it up again.
    pub async fn process_pending(&self) -> dcs_common::Result<usize> {
        let claimed = db::ingest::claim_pending(&self.db, self.batch_size).await?;
        if claimed.is_empty() {
            return Ok(0);
        }
        debug!(count = claimed.len(), "Claimed pending deposits");

        let mut settled = 0;
        for record in &claimed {
            let outcome = self.archive(record).await;
            match self.settle(record, outcome).await {
                Ok(()) => settled += 1,
                Err(e) => {
                    error!(
                        deposit_id = %record.deposit_id,
                        error = %e,
                        "Failed to record deposit outcome"
                    );
                    if let Err(e) = db::ingest::release_claim(&self.db, record.deposit_id).await {
                        error!(
                            deposit_id = %record.deposit_id,
                            error = %e,
                            "Failed to requeue deposit"
                        );
                    }
                }
            }
        }

        Ok(settled)
    }

    async fn settle(
        &self,
        record: &IngestRecord,
        outcome: ApiResult<String>,
    ) -> dcs_common::Result<()> {
        match outcome {
            Ok(du_id) => {
                db::ingest::finish_record(
                    &self.db,
                    record.deposit_id,
                    IngestStatus::Deposited,
                    Some(&du_id),
                    None,
                )
                .await?;
                info!(
                    deposit_id = %record.deposit_id,
                    object_type = %record.object_type,
                    du_id = %du_id,
                    "Deposit archived"
                );
            }
            Err(e) => {
                let message = e.to_string();
                db::ingest::finish_record(
                    &self.db,
                    record.deposit_id,
                    IngestStatus::Failed,
                    None,
                    Some(&message),
                )
                .await?;
                warn!(
                    deposit_id = %record.deposit_id,
                    object_type = %record.object_type,
                    error = %message,
                    "Deposit failed"
                );
            }
        }
        Ok(())
    }

    async fn archive(&self, record: &IngestRecord) -> ApiResult<String> {
        let package = self.build_package(record).await?;
        Ok(self.store.ingest(&package).await?)
    }

    async fn build_package(&self, record: &IngestRecord) -> ApiResult<ArchivePackage> {
        let missing = || {
            ApiError::NotFound(format!("{} {} no longer exists", record.object_type, record.object_id))
        };

        let (manifest, files) = match record.object_type {
            ObjectType::DataItem => {
                let item = db::items::load_item(&self.db, record.object_id)
                    .await?
                    .ok_or_else(missing)?;
                let files = item
                    .files
                    .iter()
                    .map(|f| {
                        Ok(PackageFile {
                            path: f.path.clone(),
                            source: deposit::path_from_uri(&f.source_uri)?,
                            sha256: f.sha256.clone(),
                        })
                    })
                    .collect::<ApiResult<Vec<_>>>()?;
                (bop::item_package(&self.db, &item).await?, files)
            }
            ObjectType::Collection => {
                let collection = db::collections::load_collection(&self.db, record.object_id)
                    .await?
                    .ok_or_else(missing)?;
                (bop::collection_package(&self.db, &collection).await?, Vec::new())
            }
            ObjectType::MetadataFile => {
                let file = db::items::load_metadata_file(&self.db, record.object_id)
                    .await?
                    .ok_or_else(missing)?;
                let source = deposit::path_from_uri(&file.source_uri)?;
                let bytes = tokio::fs::read(&source).await?;
                let files = vec![PackageFile {
                    path: file.path.clone(),
                    source,
                    sha256: super::store::sha256_hex(&bytes),
                }];
                (bop::metadata_package(&self.db, &file).await?, files)
            }
        };

        let manifest = serde_json::to_value(&manifest)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize package: {}", e)))?;

        Ok(ArchivePackage {
            deposit_id: record.deposit_id,
            object_type: record.object_type,
            object_id: record.object_id,
            manifest,
            files,
        })
    }
}
