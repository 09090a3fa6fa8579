//! Archive ingestion records
//!
//! Every deposit is handed to the archive asynchronously. The record moves
//! through PENDING → INGESTING → DEPOSITED | FAILED; clients poll it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestStatus {
    /// Waiting for the archive worker
    Pending,
    /// Claimed by the worker
    Ingesting,
    /// Stored in the archive; `du_id` is set
    Deposited,
    /// Archive rejected the package; `message` is set
    Failed,
}

text_enum!(IngestStatus {
    Pending => "PENDING",
    Ingesting => "INGESTING",
    Deposited => "DEPOSITED",
    Failed => "FAILED",
});

impl IngestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestStatus::Deposited | IngestStatus::Failed)
    }
}

/// Kind of business object being archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Collection,
    DataItem,
    MetadataFile,
}

text_enum!(ObjectType {
    Collection => "COLLECTION",
    DataItem => "DATA_ITEM",
    MetadataFile => "METADATA_FILE",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub deposit_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub status: IngestStatus,
    pub message: Option<String>,
    /// DeliverableUnit id assigned by the archive
    pub du_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestRecord {
    pub fn new(object_type: ObjectType, object_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            deposit_id: Uuid::new_v4(),
            object_type,
            object_id,
            status: IngestStatus::Pending,
            message: None,
            du_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
