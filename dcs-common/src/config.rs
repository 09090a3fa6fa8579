//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DCS_ROOT_FOLDER`, then `DCS_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: the server logs a
//! warning and falls back to compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "dcs.db";

/// Compiled-in defaults used when no configuration is available
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: default_bind_address(),
            log_level: default_log_level(),
        }
    }
}

/// Bootstrap administrator created on first startup
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_first_names")]
    pub first_names: String,
    #[serde(default = "default_admin_last_names")]
    pub last_names: String,
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            email: "admin@dataconservancy.org".to_string(),
            password: "changeme".to_string(),
            first_names: default_admin_first_names(),
            last_names: default_admin_last_names(),
        }
    }
}

/// Archive worker tuning
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArchiveConfig {
    /// Fixed interval between worker passes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum records claimed per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// TOML configuration file schema
///
/// Every field is optional; absent fields take compiled defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_session_lifetime_hours")]
    pub session_lifetime_hours: i64,
    #[serde(default)]
    pub bootstrap_admin: BootstrapAdmin,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: default_bind_address(),
            session_lifetime_hours: default_session_lifetime_hours(),
            bootstrap_admin: BootstrapAdmin::default(),
            archive: ArchiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the first platform config file found, or defaults
    pub fn load_or_default() -> Self {
        match find_config_file() {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to load config file {}: {} (using defaults)",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => {
                info!("No config file found, using compiled defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.session_lifetime_hours <= 0 {
            return Err(Error::Config(
                "session_lifetime_hours must be positive".to_string(),
            ));
        }
        if self.archive.poll_interval_ms == 0 {
            return Err(Error::Config(
                "archive.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.archive.batch_size <= 0 {
            return Err(Error::Config(
                "archive.batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolves the root folder holding the database, staged uploads and archive
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// TOML `root_folder` value (priority 3)
    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        for var in ["DCS_ROOT_FOLDER", "DCS_ROOT"] {
            if let Ok(path) = std::env::var(var) {
                if !path.is_empty() {
                    info!("[{}] Root folder from {}: {}", self.module_name, var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from config file: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = default_root_folder();
        info!("[{}] Root folder from compiled default: {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder layout
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.staging_dir(), self.archive_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Uploaded files waiting for ingestion
    pub fn staging_dir(&self) -> PathBuf {
        self.root_folder.join("staging")
    }

    /// Filesystem archive store
    pub fn archive_dir(&self) -> PathBuf {
        self.root_folder.join("archive")
    }
}

/// Get default configuration file path for the platform
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("dcs").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/dcs/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("dcs"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/dcs"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("dcs"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/dcs"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("dcs"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\dcs"))
    } else {
        PathBuf::from("./dcs_data")
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_lifetime_hours() -> i64 {
    24
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_batch_size() -> i64 {
    10
}

fn default_admin_first_names() -> String {
    "Site".to_string()
}

fn default_admin_last_names() -> String {
    "Administrator".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.session_lifetime_hours, 24);
        assert_eq!(config.archive.poll_interval_ms, 500);
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            bind_address = "0.0.0.0:9000"

            [archive]
            poll_interval_ms = 50

            [bootstrap_admin]
            email = "root@example.org"
            password = "s3cret!"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.archive.poll_interval_ms, 50);
        assert_eq!(config.archive.batch_size, 10);
        assert_eq!(config.bootstrap_admin.email, "root@example.org");
        assert_eq!(config.bootstrap_admin.last_names, "Administrator");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TomlConfig::from_toml_str("session_lifetime_hours = 0").is_err());
        assert!(TomlConfig::from_toml_str("[archive]\npoll_interval_ms = 0").is_err());
        assert!(TomlConfig::from_toml_str("bind_address = [").is_err());
    }
}
