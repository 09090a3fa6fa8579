//! Per-collection depositor allow-list

use dcs_common::model::Person;
use dcs_common::time;
use dcs_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_uuid, people};

/// Grant deposit rights; false if the grant already existed
pub async fn add_depositor(pool: &SqlitePool, collection_id: Uuid, person_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO collection_depositors (collection_id, person_id, granted_at) \
         VALUES (?, ?, ?)",
    )
    .bind(collection_id.to_string())
    .bind(person_id.to_string())
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Revoke deposit rights; false if there was no grant
pub async fn remove_depositor(
    pool: &SqlitePool,
    collection_id: Uuid,
    person_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "DELETE FROM collection_depositors WHERE collection_id = ? AND person_id = ?",
    )
    .bind(collection_id.to_string())
    .bind(person_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn is_depositor(pool: &SqlitePool, collection_id: Uuid, person_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM collection_depositors WHERE collection_id = ? AND person_id = ?)",
    )
    .bind(collection_id.to_string())
    .bind(person_id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn list_depositors(pool: &SqlitePool, collection_id: Uuid) -> Result<Vec<Person>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT person_id FROM collection_depositors WHERE collection_id = ? ORDER BY granted_at",
    )
    .bind(collection_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut depositors = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(person) = people::load_person(pool, parse_uuid("depositor", id)?).await? {
            depositors.push(person);
        }
    }
    Ok(depositors)
}

/// Collections where the person holds an explicit grant
pub async fn collections_for(pool: &SqlitePool, person_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT collection_id FROM collection_depositors WHERE person_id = ? ORDER BY granted_at",
    )
    .bind(person_id.to_string())
    .fetch_all(pool)
    .await?;

    ids.iter().map(|id| parse_uuid("collection", id)).collect()
}
