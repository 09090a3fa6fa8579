//! Tests for configuration and root folder resolution
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! DCS_ROOT_FOLDER or DCS_ROOT are marked #[serial].

use dcs_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var("DCS_ROOT_FOLDER");
    env::remove_var("DCS_ROOT");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_env();

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert!(!root_folder.as_os_str().is_empty());
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    clear_env();
    env::set_var("DCS_ROOT_FOLDER", "/tmp/dcs-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/dcs-cli")))
        .with_toml_root(Some(PathBuf::from("/tmp/dcs-toml")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/dcs-cli"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    clear_env();
    env::set_var("DCS_ROOT", "/tmp/dcs-env-root");

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/dcs-toml")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/dcs-env-root"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_var_takes_precedence() {
    clear_env();
    env::set_var("DCS_ROOT_FOLDER", "/tmp/dcs-priority-1");
    env::set_var("DCS_ROOT", "/tmp/dcs-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/dcs-priority-1"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    clear_env();

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/srv/dcs")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/srv/dcs"));
}

#[test]
fn test_initializer_layout() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("dcs.db"));
    assert!(!initializer.database_exists());

    initializer.ensure_directory_exists().unwrap();
    assert!(initializer.staging_dir().is_dir());
    assert!(initializer.archive_dir().is_dir());

    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();
}

#[test]
fn test_toml_file_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/data/dcs"
        session_lifetime_hours = 8

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/data/dcs")));
    assert_eq!(config.session_lifetime_hours, 8);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_toml_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    assert!(TomlConfig::load(&dir.path().join("absent.toml")).is_err());
}
