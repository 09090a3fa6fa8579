//! Collections and the parent/child hierarchy

use dcs_common::model::Collection;
use dcs_common::time;
use dcs_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use super::{from_json, parse_opt_uuid, parse_uuid, to_json};

const COLLECTION_COLUMNS: &str = "id, project_id, parent_id, title, summary, citable_locator, \
                                  publication_date, creators, contact_info, alternate_ids, created_at";

pub async fn insert_collection(conn: &mut SqliteConnection, collection: &Collection) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO collections (
            id, project_id, parent_id, title, summary, citable_locator,
            publication_date, creators, contact_info, alternate_ids, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(collection.id.to_string())
    .bind(collection.project_id.to_string())
    .bind(collection.parent_id.map(|id| id.to_string()))
    .bind(&collection.title)
    .bind(&collection.summary)
    .bind(&collection.citable_locator)
    .bind(collection.publication_date.map(|d| d.to_string()))
    .bind(to_json("creators", &collection.creators)?)
    .bind(to_json("contact_info", &collection.contact_info)?)
    .bind(to_json("alternate_ids", &collection.alternate_ids)?)
    .bind(time::to_db(&collection.created_at))
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_collection(conn: &mut SqliteConnection, collection: &Collection) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE collections SET
            parent_id = ?, title = ?, summary = ?, citable_locator = ?,
            publication_date = ?, creators = ?, contact_info = ?, alternate_ids = ?
        WHERE id = ?
        "#,
    )
    .bind(collection.parent_id.map(|id| id.to_string()))
    .bind(&collection.title)
    .bind(&collection.summary)
    .bind(&collection.citable_locator)
    .bind(collection.publication_date.map(|d| d.to_string()))
    .bind(to_json("creators", &collection.creators)?)
    .bind(to_json("contact_info", &collection.contact_info)?)
    .bind(to_json("alternate_ids", &collection.alternate_ids)?)
    .bind(collection.id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

fn collection_from_row(row: &SqliteRow) -> Result<Collection> {
    let id: String = row.get("id");
    let project_id: String = row.get("project_id");
    let creators: String = row.get("creators");
    let contact_info: String = row.get("contact_info");
    let alternate_ids: String = row.get("alternate_ids");
    let created_at: String = row.get("created_at");

    Ok(Collection {
        id: parse_uuid("collection", &id)?,
        project_id: parse_uuid("project", &project_id)?,
        parent_id: parse_opt_uuid("parent", row.get("parent_id"))?,
        title: row.get("title"),
        summary: row.get("summary"),
        citable_locator: row.get("citable_locator"),
        publication_date: time::date_from_db("publication_date", row.get("publication_date"))?,
        creators: from_json("creators", &creators)?,
        contact_info: from_json("contact_info", &contact_info)?,
        alternate_ids: from_json("alternate_ids", &alternate_ids)?,
        created_at: time::from_db("created_at", &created_at)?,
    })
}

/// Works on the pool or inside a transaction
pub async fn load_collection<'e, E>(executor: E, id: Uuid) -> Result<Option<Collection>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM collections WHERE id = ?",
        COLLECTION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(collection_from_row).transpose()
}

pub async fn list_by_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Collection>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM collections WHERE project_id = ? ORDER BY created_at, title",
        COLLECTION_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(collection_from_row).collect()
}

/// Direct sub-collections
pub async fn children<'e, E>(executor: E, parent_id: Uuid) -> Result<Vec<Collection>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(&format!(
        "SELECT {} FROM collections WHERE parent_id = ? ORDER BY created_at, title",
        COLLECTION_COLUMNS
    ))
    .bind(parent_id.to_string())
    .fetch_all(executor)
    .await?;

    rows.iter().map(collection_from_row).collect()
}
