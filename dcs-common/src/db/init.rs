//! Database initialization
//!
//! Creates the database file on first run, applies pragmas, creates every
//! table with `CREATE TABLE IF NOT EXISTS`, runs versioned migrations and
//! seeds default settings. Safe to call on an existing database.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use super::retry::MAX_LOCK_WAIT_SETTING;
use super::settings::ensure_setting;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets HTTP handlers read while the archive worker writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    super::migrations::run_migrations(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_people_tables(pool).await?;
    create_sessions_table(pool).await?;
    create_project_tables(pool).await?;
    create_collection_tables(pool).await?;
    create_data_item_tables(pool).await?;
    create_metadata_tables(pool).await?;
    create_ingest_records_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_people_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            first_names TEXT NOT NULL,
            last_names TEXT NOT NULL,
            phone_number TEXT,
            registration_status TEXT NOT NULL DEFAULT 'PENDING',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS person_roles (
            person_id TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            PRIMARY KEY (person_id, role)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            person_id TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_project_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_date TEXT,
            end_date TEXT,
            funding_entity TEXT,
            award_numbers TEXT NOT NULL DEFAULT '[]',
            storage_allocated INTEGER NOT NULL DEFAULT 0,
            storage_used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_pis (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            person_id TEXT NOT NULL REFERENCES people(id),
            PRIMARY KEY (project_id, person_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collection_tables(pool: &SqlitePool) -> Result<()> {
    // creators, contact_info and alternate_ids are JSON arrays
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id),
            parent_id TEXT REFERENCES collections(id),
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            citable_locator TEXT,
            publication_date TEXT,
            creators TEXT NOT NULL DEFAULT '[]',
            contact_info TEXT NOT NULL DEFAULT '[]',
            alternate_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_depositors (
            collection_id TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            person_id TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            granted_at TEXT NOT NULL,
            PRIMARY KEY (collection_id, person_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_data_item_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_items (
            id TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL REFERENCES collections(id),
            name TEXT NOT NULL,
            description TEXT,
            depositor_id TEXT NOT NULL REFERENCES people(id),
            deposit_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_files (
            id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES data_items(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            source_uri TEXT NOT NULL,
            path TEXT NOT NULL,
            size INTEGER NOT NULL,
            sha256 TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_metadata_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metadata_formats (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            schema_url TEXT,
            root_element TEXT NOT NULL,
            namespace TEXT,
            applies_to TEXT NOT NULL,
            validates INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            UNIQUE (name, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metadata_files (
            id TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL REFERENCES collections(id),
            name TEXT NOT NULL,
            format_id TEXT NOT NULL REFERENCES metadata_formats(id),
            source_uri TEXT NOT NULL,
            path TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ingest_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_records (
            deposit_id TEXT PRIMARY KEY,
            object_type TEXT NOT NULL,
            object_id TEXT NOT NULL,
            status TEXT NOT NULL,
            message TEXT,
            du_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed default runtime settings (existing values are preserved)
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "session_lifetime_hours", "24").await?;
    ensure_setting(pool, "archive_poll_interval_ms", "500").await?;
    ensure_setting(pool, "archive_batch_size", "10").await?;
    ensure_setting(pool, "deposit_max_file_bytes", "104857600").await?; // 100 MiB
    ensure_setting(pool, MAX_LOCK_WAIT_SETTING, "5000").await?;
    Ok(())
}
