//! Archive storage backends
//!
//! An [`ArchiveStore`] accepts a package (JSON manifest plus payload files)
//! and returns the DeliverableUnit id it was stored under.
//!
//! [`FsArchiveStore`] lays units out as:
//!
//! ```text
//! <archive>/<du_id>/unit.json      package manifest and file listing
//! <archive>/<du_id>/files/<path>   payload copies
//! ```
//!
//! A unit is assembled in a hidden staging directory and renamed into
//! place, so a reader never observes a half-written unit.

use chrono::{DateTime, Utc};
use dcs_common::model::ObjectType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

const UNIT_FILE: &str = "unit.json";
const FILES_DIR: &str = "files";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fixity check failed for {path}: expected {expected}, got {actual}")]
    Fixity {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid payload path: {0}")]
    InvalidPath(String),

    #[error("Malformed unit {du_id}: {reason}")]
    Malformed { du_id: String, reason: String },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One payload file to be archived
#[derive(Debug, Clone)]
pub struct PackageFile {
    /// Relative path inside the unit
    pub path: String,
    /// Where the bytes currently live
    pub source: PathBuf,
    /// Expected SHA-256 (hex); checked after the copy
    pub sha256: String,
}

/// Everything the archive needs to create a DeliverableUnit
#[derive(Debug, Clone)]
pub struct ArchivePackage {
    pub deposit_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    /// Serialized business object package describing the object
    pub manifest: serde_json::Value,
    pub files: Vec<PackageFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedFile {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// A stored DeliverableUnit as read back from the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedUnit {
    pub du_id: String,
    pub deposit_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub archived_at: DateTime<Utc>,
    pub manifest: serde_json::Value,
    pub files: Vec<ArchivedFile>,
}

#[async_trait::async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Store a package; returns the new DeliverableUnit id
    async fn ingest(&self, package: &ArchivePackage) -> Result<String, ArchiveError>;

    /// Fetch a unit by DeliverableUnit id
    async fn retrieve(&self, du_id: &str) -> Result<Option<ArchivedUnit>, ArchiveError>;

    /// All units holding objects of the given type
    async fn list(&self, object_type: ObjectType) -> Result<Vec<ArchivedUnit>, ArchiveError>;
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Reject absolute paths and `..` so payloads stay inside their unit
pub fn sanitize_relative_path(path: &str) -> Result<PathBuf, ArchiveError> {
    let candidate = Path::new(path);
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(ArchiveError::InvalidPath(path.to_string())),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ArchiveError::InvalidPath(path.to_string()));
    }
    Ok(clean)
}

/// Filesystem-backed archive
#[derive(Debug, Clone)]
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unit_dir(&self, du_id: &str) -> PathBuf {
        self.root.join(du_id)
    }

    async fn write_unit(
        &self,
        staging: &Path,
        du_id: &str,
        package: &ArchivePackage,
    ) -> Result<(), ArchiveError> {
        let files_dir = staging.join(FILES_DIR);
        fs::create_dir_all(&files_dir).await.map_err(io_err(&files_dir))?;

        let mut archived = Vec::with_capacity(package.files.len());
        for file in &package.files {
            let relative = sanitize_relative_path(&file.path)?;
            let dest = files_dir.join(&relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await.map_err(io_err(parent))?;
            }

            fs::copy(&file.source, &dest).await.map_err(io_err(&file.source))?;

            let bytes = fs::read(&dest).await.map_err(io_err(&dest))?;
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(&file.sha256) {
                return Err(ArchiveError::Fixity {
                    path: file.path.clone(),
                    expected: file.sha256.clone(),
                    actual,
                });
            }

            archived.push(ArchivedFile {
                path: file.path.clone(),
                size: bytes.len() as u64,
                sha256: actual,
            });
        }

        let unit = ArchivedUnit {
            du_id: du_id.to_string(),
            deposit_id: package.deposit_id,
            object_type: package.object_type,
            object_id: package.object_id,
            archived_at: Utc::now(),
            manifest: package.manifest.clone(),
            files: archived,
        };

        let unit_path = staging.join(UNIT_FILE);
        let json = serde_json::to_vec_pretty(&unit).map_err(|e| ArchiveError::Malformed {
            du_id: du_id.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&unit_path, json).await.map_err(io_err(&unit_path))?;

        Ok(())
    }

    async fn read_unit(&self, du_id: &str) -> Result<Option<ArchivedUnit>, ArchiveError> {
        let path = self.unit_dir(du_id).join(UNIT_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArchiveError::Malformed {
                du_id: du_id.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl ArchiveStore for FsArchiveStore {
    async fn ingest(&self, package: &ArchivePackage) -> Result<String, ArchiveError> {
        fs::create_dir_all(&self.root).await.map_err(io_err(&self.root))?;

        let du_id = format!("du-{}", Uuid::new_v4());
        let staging = self.root.join(format!(".{}.partial", du_id));

        if let Err(e) = self.write_unit(&staging, &du_id, package).await {
            if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "Failed to remove partial unit");
            }
            return Err(e);
        }

        let dest = self.unit_dir(&du_id);
        fs::rename(&staging, &dest).await.map_err(io_err(&dest))?;

        info!(
            du_id = %du_id,
            deposit_id = %package.deposit_id,
            object_type = %package.object_type,
            files = package.files.len(),
            "Archived deliverable unit"
        );
        Ok(du_id)
    }

    async fn retrieve(&self, du_id: &str) -> Result<Option<ArchivedUnit>, ArchiveError> {
        if sanitize_relative_path(du_id)?.components().count() != 1 {
            return Err(ArchiveError::InvalidPath(du_id.to_string()));
        }
        self.read_unit(du_id).await
    }

    async fn list(&self, object_type: ObjectType) -> Result<Vec<ArchivedUnit>, ArchiveError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.root)(e)),
        };

        let mut units = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&self.root))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match self.read_unit(&name).await {
                Ok(Some(unit)) if unit.object_type == object_type => units.push(unit),
                Ok(_) => {}
                Err(e) => debug!(entry = %name, error = %e, "Skipping unreadable archive entry"),
            }
        }

        units.sort_by(|a, b| a.archived_at.cmp(&b.archived_at));
        Ok(units)
    }
}
