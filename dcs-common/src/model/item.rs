//! Data items, their files, and collection metadata files

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single file belonging to a data item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub id: Uuid,
    pub name: String,
    /// Where the bytes live (`file://` URI into staging or the archive)
    pub source_uri: String,
    /// Relative path of the file inside the item
    pub path: String,
    pub size: i64,
    pub sha256: String,
}

/// A deposited unit of data inside a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub depositor_id: Uuid,
    pub deposit_date: DateTime<Utc>,
    pub files: Vec<DataFile>,
}

impl DataItem {
    pub fn total_size(&self) -> i64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Metadata document attached to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub format_id: Uuid,
    pub source_uri: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}
