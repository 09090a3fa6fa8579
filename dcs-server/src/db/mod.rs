//! Database access for dcs-server
//!
//! One module per aggregate. Reads take the pool; multi-statement writes
//! take a connection so callers can group them in a transaction.

pub mod collections;
pub mod depositors;
pub mod ingest;
pub mod items;
pub mod metadata_formats;
pub mod people;
pub mod projects;
pub mod sessions;

use dcs_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid {} uuid {:?}: {}", field, value, e)))
}

pub(crate) fn parse_opt_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>> {
    value.map(|v| parse_uuid(field, &v)).transpose()
}

pub(crate) fn from_json<T: DeserializeOwned>(field: &str, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", field, e)))
}

pub(crate) fn to_json<T: Serialize>(field: &str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", field, e)))
}
