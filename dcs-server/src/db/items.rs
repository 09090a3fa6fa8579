//! Data items, data files and collection metadata files

use dcs_common::model::{DataFile, DataItem, MetadataFile};
use dcs_common::time;
use dcs_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

const ITEM_COLUMNS: &str = "id, collection_id, name, description, depositor_id, deposit_date";

pub async fn insert_item(conn: &mut SqliteConnection, item: &DataItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO data_items (id, collection_id, name, description, depositor_id, deposit_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.collection_id.to_string())
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.depositor_id.to_string())
    .bind(time::to_db(&item.deposit_date))
    .execute(&mut *conn)
    .await?;

    for (position, file) in item.files.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO data_files (id, item_id, position, name, source_uri, path, size, sha256)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(file.id.to_string())
        .bind(item.id.to_string())
        .bind(position as i64)
        .bind(&file.name)
        .bind(&file.source_uri)
        .bind(&file.path)
        .bind(file.size)
        .bind(&file.sha256)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_files(pool: &SqlitePool, item_id: &str) -> Result<Vec<DataFile>> {
    let rows = sqlx::query(
        "SELECT id, name, source_uri, path, size, sha256 FROM data_files \
         WHERE item_id = ? ORDER BY position",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            Ok(DataFile {
                id: parse_uuid("data file", &id)?,
                name: row.get("name"),
                source_uri: row.get("source_uri"),
                path: row.get("path"),
                size: row.get("size"),
                sha256: row.get("sha256"),
            })
        })
        .collect()
}

async fn item_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<DataItem> {
    let id: String = row.get("id");
    let collection_id: String = row.get("collection_id");
    let depositor_id: String = row.get("depositor_id");
    let deposit_date: String = row.get("deposit_date");

    Ok(DataItem {
        id: parse_uuid("data item", &id)?,
        collection_id: parse_uuid("collection", &collection_id)?,
        name: row.get("name"),
        description: row.get("description"),
        depositor_id: parse_uuid("depositor", &depositor_id)?,
        deposit_date: time::from_db("deposit_date", &deposit_date)?,
        files: load_files(pool, &id).await?,
    })
}

pub async fn load_item(pool: &SqlitePool, id: Uuid) -> Result<Option<DataItem>> {
    let row = sqlx::query(&format!("SELECT {} FROM data_items WHERE id = ?", ITEM_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(item_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn count_items(pool: &SqlitePool, collection_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_items WHERE collection_id = ?")
        .bind(collection_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of a collection's items, oldest first
pub async fn list_items(
    pool: &SqlitePool,
    collection_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<DataItem>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM data_items WHERE collection_id = ? \
         ORDER BY deposit_date, id LIMIT ? OFFSET ?",
        ITEM_COLUMNS
    ))
    .bind(collection_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        items.push(item_from_row(pool, row).await?);
    }
    Ok(items)
}

/// Every item of a collection (package export)
pub async fn list_all_items(pool: &SqlitePool, collection_id: Uuid) -> Result<Vec<DataItem>> {
    list_items(pool, collection_id, -1, 0).await
}

pub async fn insert_metadata_file(conn: &mut SqliteConnection, file: &MetadataFile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO metadata_files (id, collection_id, name, format_id, source_uri, path, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(file.id.to_string())
    .bind(file.collection_id.to_string())
    .bind(&file.name)
    .bind(file.format_id.to_string())
    .bind(&file.source_uri)
    .bind(&file.path)
    .bind(time::to_db(&file.created_at))
    .execute(conn)
    .await?;
    Ok(())
}

fn metadata_file_from_row(row: &SqliteRow) -> Result<MetadataFile> {
    let id: String = row.get("id");
    let collection_id: String = row.get("collection_id");
    let format_id: String = row.get("format_id");
    let created_at: String = row.get("created_at");

    Ok(MetadataFile {
        id: parse_uuid("metadata file", &id)?,
        collection_id: parse_uuid("collection", &collection_id)?,
        name: row.get("name"),
        format_id: parse_uuid("metadata format", &format_id)?,
        source_uri: row.get("source_uri"),
        path: row.get("path"),
        created_at: time::from_db("created_at", &created_at)?,
    })
}

pub async fn load_metadata_file(pool: &SqlitePool, id: Uuid) -> Result<Option<MetadataFile>> {
    let row = sqlx::query(
        "SELECT id, collection_id, name, format_id, source_uri, path, created_at \
         FROM metadata_files WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(metadata_file_from_row).transpose()
}

pub async fn list_metadata_files(pool: &SqlitePool, collection_id: Uuid) -> Result<Vec<MetadataFile>> {
    let rows = sqlx::query(
        "SELECT id, collection_id, name, format_id, source_uri, path, created_at \
         FROM metadata_files WHERE collection_id = ? ORDER BY created_at",
    )
    .bind(collection_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(metadata_file_from_row).collect()
}
