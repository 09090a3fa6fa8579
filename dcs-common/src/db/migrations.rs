//! Database schema migrations
//!
//! Versioned, idempotent schema changes tracked in `schema_version`.
//! Never modify an existing migration; add a new one and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database (0 if none recorded)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: lookup indexes for the hot query paths
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_ingest_records_status ON ingest_records(status, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_ingest_records_object ON ingest_records(object_id)",
        "CREATE INDEX IF NOT EXISTS idx_collections_project ON collections(project_id)",
        "CREATE INDEX IF NOT EXISTS idx_collections_parent ON collections(parent_id)",
        "CREATE INDEX IF NOT EXISTS idx_data_items_collection ON data_items(collection_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_person ON sessions(person_id)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Migration v2: add storage_used to projects created before quotas existed
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('projects') WHERE name = 'storage_used'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  storage_used column already exists - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE projects ADD COLUMN storage_used INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await?;

    info!("  ✓ Added storage_used column to projects table");
    Ok(())
}
