//! Data item deposit and metadata attachment
//!
//! Uploaded bytes arrive base64 encoded inside the JSON request. They are
//! written under the staging directory, checksummed, and recorded with a
//! `file://` source URI. The item, its files, the quota charge and the
//! PENDING ingest record are committed in one transaction; the archive
//! worker picks the record up from there.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dcs_common::db::get_setting;
use dcs_common::model::{
    DataFile, DataItem, FormatTarget, IngestRecord, IngestStatus, MetadataFile, ObjectType,
    Person,
};
use dcs_common::time;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::archive::store::{sanitize_relative_path, sha256_hex};
use crate::services::{authorization, metadata_validator};

pub const MAX_FILE_BYTES_SETTING: &str = "deposit_max_file_bytes";
pub const DEFAULT_MAX_FILE_BYTES: i64 = 100 * 1024 * 1024;

/// Room for the JSON envelope around the encoded payload
const BODY_ENVELOPE_BYTES: usize = 1024 * 1024;

/// Largest request body that can carry one file of `max_file_bytes`
///
/// Base64 grows the payload by 4/3, rounded up to whole 4-byte groups.
pub fn request_body_limit(max_file_bytes: i64) -> usize {
    let raw = usize::try_from(max_file_bytes.max(0)).unwrap_or(usize::MAX);
    raw.div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_ENVELOPE_BYTES)
}

/// Body limit for the current file size setting
pub async fn configured_body_limit(pool: &SqlitePool) -> ApiResult<usize> {
    let max_file_bytes: i64 =
        get_setting(pool, MAX_FILE_BYTES_SETTING, DEFAULT_MAX_FILE_BYTES).await?;
    Ok(request_body_limit(max_file_bytes))
}

/// One uploaded file
#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub name: String,
    /// Relative path inside the item; defaults to `name`
    #[serde(default)]
    pub path: Option<String>,
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<NewFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRequest {
    pub format_id: Uuid,
    pub name: String,
    pub content_base64: String,
}

/// Returned with 202 Accepted
#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub deposit_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub status: IngestStatus,
}

impl From<&IngestRecord> for DepositReceipt {
    fn from(record: &IngestRecord) -> Self {
        Self {
            deposit_id: record.deposit_id,
            object_type: record.object_type,
            object_id: record.object_id,
            status: record.status,
        }
    }
}

/// `file://` URI for an absolute path
pub fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Local path behind a `file://` URI
pub fn path_from_uri(uri: &str) -> ApiResult<PathBuf> {
    uri.strip_prefix("file://")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::Internal(format!("Unsupported source URI: {}", uri)))
}

struct DecodedFile {
    name: String,
    path: String,
    bytes: Vec<u8>,
}

fn decode_files(files: &[NewFile], max_file_bytes: i64) -> ApiResult<Vec<DecodedFile>> {
    let mut seen = HashSet::new();
    let mut decoded = Vec::with_capacity(files.len());

    for file in files {
        let name = file.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("File name is required".to_string()));
        }

        let raw_path = file.path.as_deref().unwrap_or(name);
        let path = sanitize_relative_path(raw_path)
            .map_err(|_| ApiError::BadRequest(format!("Invalid file path: {:?}", raw_path)))?
            .to_string_lossy()
            .into_owned();
        if !seen.insert(path.clone()) {
            return Err(ApiError::BadRequest(format!("Duplicate file path: {}", path)));
        }

        let bytes = BASE64
            .decode(file.content_base64.trim())
            .map_err(|e| ApiError::BadRequest(format!("File {} is not valid base64: {}", name, e)))?;
        if bytes.len() as i64 > max_file_bytes {
            return Err(ApiError::BadRequest(format!(
                "File {} exceeds the {} byte limit",
                name, max_file_bytes
            )));
        }

        decoded.push(DecodedFile {
            name: name.to_string(),
            path,
            bytes,
        });
    }

    Ok(decoded)
}

async fn remove_staged(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!(path = %dir.display(), error = %e, "Failed to clean up staged files");
    }
}

/// Deposit a new data item into a collection
pub async fn deposit_item(
    pool: &SqlitePool,
    staging_dir: &Path,
    person: &Person,
    collection_id: Uuid,
    request: &DepositRequest,
) -> ApiResult<(DataItem, IngestRecord)> {
    let (collection, project) =
        authorization::require_depositor(pool, person, collection_id).await?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Data item name is required".to_string()));
    }
    if request.files.is_empty() {
        return Err(ApiError::BadRequest(
            "A deposit needs at least one file".to_string(),
        ));
    }

    let max_file_bytes: i64 =
        get_setting(pool, MAX_FILE_BYTES_SETTING, DEFAULT_MAX_FILE_BYTES).await?;
    let files = decode_files(&request.files, max_file_bytes)?;
    let total: i64 = files.iter().map(|f| f.bytes.len() as i64).sum();

    if !project.has_capacity_for(total) {
        return Err(ApiError::BadRequest(format!(
            "Deposit of {} bytes exceeds the storage allocation of project {}",
            total, project.id
        )));
    }

    let item_id = Uuid::new_v4();
    let item_dir = staging_dir.join(item_id.to_string());

    let mut data_files = Vec::with_capacity(files.len());
    for file in &files {
        let dest = item_dir.join(&file.path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Err(e) = tokio::fs::write(&dest, &file.bytes).await {
            remove_staged(&item_dir).await;
            return Err(e.into());
        }
        data_files.push(DataFile {
            id: Uuid::new_v4(),
            name: file.name.clone(),
            source_uri: file_uri(&dest),
            path: file.path.clone(),
            size: file.bytes.len() as i64,
            sha256: sha256_hex(&file.bytes),
        });
    }

    let item = DataItem {
        id: item_id,
        collection_id: collection.id,
        name: name.to_string(),
        description: request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        depositor_id: person.id,
        deposit_date: time::now(),
        files: data_files,
    };
    let record = IngestRecord::new(ObjectType::DataItem, item.id);

    if let Err(e) = commit_item(pool, project.id, total, &item, &record).await {
        remove_staged(&item_dir).await;
        return Err(e);
    }

    info!(
        deposit_id = %record.deposit_id,
        item_id = %item.id,
        collection_id = %collection.id,
        depositor = %person.id,
        files = item.files.len(),
        bytes = total,
        "Data item deposited"
    );

    Ok((item, record))
}

async fn commit_item(
    pool: &SqlitePool,
    project_id: Uuid,
    total: i64,
    item: &DataItem,
    record: &IngestRecord,
) -> ApiResult<()> {
    let mut tx = pool.begin().await?;

    if !db::projects::reserve_storage(&mut *tx, project_id, total).await? {
        return Err(ApiError::BadRequest(format!(
            "Deposit of {} bytes exceeds the storage allocation of project {}",
            total, project_id
        )));
    }
    db::items::insert_item(&mut *tx, item).await?;
    db::ingest::insert_record(&mut *tx, record).await?;

    tx.commit().await?;
    Ok(())
}

/// Attach a metadata document to a collection
///
/// Only project managers may attach metadata. The document must pass the
/// chosen format's checks and the format must apply to collections.
pub async fn attach_metadata(
    pool: &SqlitePool,
    staging_dir: &Path,
    person: &Person,
    collection_id: Uuid,
    request: &MetadataRequest,
) -> ApiResult<(MetadataFile, IngestRecord)> {
    let (collection, _project) =
        authorization::require_collection_manager(pool, person, collection_id).await?;

    let format = db::metadata_formats::load_format(pool, request.format_id)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown metadata format: {}", request.format_id))
        })?;
    if format.applies_to != FormatTarget::Collection {
        return Err(ApiError::BadRequest(format!(
            "Metadata format {} {} does not apply to collections",
            format.name, format.version
        )));
    }

    let name = request.name.trim();
    let path = sanitize_relative_path(name)
        .map_err(|_| ApiError::BadRequest(format!("Invalid metadata file name: {:?}", name)))?
        .to_string_lossy()
        .into_owned();

    let bytes = BASE64
        .decode(request.content_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("Metadata file is not valid base64: {}", e)))?;

    metadata_validator::validate(&format, &bytes).map_err(|e| {
        ApiError::BadRequest(format!(
            "Metadata does not validate against {} {}: {}",
            format.name, format.version, e
        ))
    })?;

    let file_id = Uuid::new_v4();
    let dir = staging_dir.join("metadata").join(file_id.to_string());
    let dest = dir.join(&path);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&dest, &bytes).await?;

    let file = MetadataFile {
        id: file_id,
        collection_id: collection.id,
        name: name.to_string(),
        format_id: format.id,
        source_uri: file_uri(&dest),
        path,
        created_at: time::now(),
    };
    let record = IngestRecord::new(ObjectType::MetadataFile, file.id);

    let committed = async {
        let mut tx = pool.begin().await?;
        db::items::insert_metadata_file(&mut *tx, &file).await?;
        db::ingest::insert_record(&mut *tx, &record).await?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    }
    .await;
    if let Err(e) = committed {
        remove_staged(&dir).await;
        return Err(e);
    }

    info!(
        deposit_id = %record.deposit_id,
        metadata_file_id = %file.id,
        collection_id = %collection.id,
        format = %format.name,
        "Metadata attached"
    );

    Ok((file, record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(name: &str, path: Option<&str>, content: &[u8]) -> NewFile {
        NewFile {
            name: name.to_string(),
            path: path.map(str::to_string),
            content_base64: BASE64.encode(content),
        }
    }

    #[test]
    fn test_decode_defaults_path_to_name() {
        let decoded = decode_files(&[new_file("a.txt", None, b"hello")], 1024).unwrap();
        assert_eq!(decoded[0].path, "a.txt");
        assert_eq!(decoded[0].bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let bad_base64 = NewFile {
            name: "a".to_string(),
            path: None,
            content_base64: "***".to_string(),
        };
        assert!(decode_files(&[bad_base64], 1024).is_err());

        let traversal = new_file("a", Some("../../etc/passwd"), b"x");
        assert!(decode_files(&[traversal], 1024).is_err());

        let dupes = [new_file("a", Some("x/a"), b"1"), new_file("b", Some("x/a"), b"2")];
        assert!(decode_files(&dupes, 1024).is_err());

        assert!(decode_files(&[new_file("big", None, &[0u8; 16])], 8).is_err());
    }

    #[test]
    fn test_body_limit_fits_encoded_file() {
        let file = vec![7u8; 3 * 1024 * 1024 + 1];
        let encoded = BASE64.encode(&file);
        let limit = request_body_limit(file.len() as i64);
        assert!(limit >= encoded.len() + 1024);
        assert_eq!(request_body_limit(-5), 1024 * 1024);
    }

    #[test]
    fn test_file_uri_roundtrip() {
        let path = Path::new("/srv/dcs/staging/item/data.csv");
        let uri = file_uri(path);
        assert_eq!(uri, "file:///srv/dcs/staging/item/data.csv");
        assert_eq!(path_from_uri(&uri).unwrap(), path);
        assert!(path_from_uri("http://example.org/x").is_err());
    }
}
