//! Metadata format registry

use dcs_common::model::MetadataFormat;
use dcs_common::time;
use dcs_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

const FORMAT_COLUMNS: &str = "id, name, version, schema_url, root_element, namespace, \
                              applies_to, validates, created_at";

pub async fn insert_format(pool: &SqlitePool, format: &MetadataFormat) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO metadata_formats (
            id, name, version, schema_url, root_element, namespace,
            applies_to, validates, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(format.id.to_string())
    .bind(&format.name)
    .bind(&format.version)
    .bind(&format.schema_url)
    .bind(&format.root_element)
    .bind(&format.namespace)
    .bind(format.applies_to.as_str())
    .bind(format.validates)
    .bind(time::to_db(&format.created_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn format_exists(pool: &SqlitePool, name: &str, version: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM metadata_formats WHERE name = ? AND version = ?)",
    )
    .bind(name)
    .bind(version)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

fn format_from_row(row: &SqliteRow) -> Result<MetadataFormat> {
    let id: String = row.get("id");
    let applies_to: String = row.get("applies_to");
    let created_at: String = row.get("created_at");

    Ok(MetadataFormat {
        id: parse_uuid("metadata format", &id)?,
        name: row.get("name"),
        version: row.get("version"),
        schema_url: row.get("schema_url"),
        root_element: row.get("root_element"),
        namespace: row.get("namespace"),
        applies_to: applies_to.parse()?,
        validates: row.get("validates"),
        created_at: time::from_db("created_at", &created_at)?,
    })
}

pub async fn load_format(pool: &SqlitePool, id: Uuid) -> Result<Option<MetadataFormat>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM metadata_formats WHERE id = ?",
        FORMAT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(format_from_row).transpose()
}

pub async fn list_formats(pool: &SqlitePool) -> Result<Vec<MetadataFormat>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM metadata_formats ORDER BY name, version",
        FORMAT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(format_from_row).collect()
}

/// Toggle validation; false if the format does not exist
pub async fn set_validates(pool: &SqlitePool, id: Uuid, validates: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE metadata_formats SET validates = ? WHERE id = ?")
        .bind(validates)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
