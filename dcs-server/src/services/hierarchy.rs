//! Collection parent/child traversal
//!
//! Collections form a forest inside each project. Walks keep a visited set
//! and stop at the first revisit. Downward walks and parent checks take a
//! connection so they can run inside the transaction that moves a collection.

use dcs_common::model::Collection;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};

/// Parent chain of a collection, nearest parent first
pub async fn ancestors(pool: &SqlitePool, collection: &Collection) -> ApiResult<Vec<Collection>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([collection.id]);
    let mut next = collection.parent_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            break;
        }
        match db::collections::load_collection(pool, parent_id).await? {
            Some(parent) => {
                next = parent.parent_id;
                chain.push(parent);
            }
            None => break,
        }
    }

    Ok(chain)
}

/// All collections below `root_id`, breadth first, excluding the root
pub async fn descendants(
    conn: &mut SqliteConnection,
    root_id: Uuid,
) -> ApiResult<Vec<Collection>> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);

    while let Some(id) = queue.pop_front() {
        for child in db::collections::children(&mut *conn, id).await? {
            if seen.insert(child.id) {
                queue.push_back(child.id);
                found.push(child);
            }
        }
    }

    Ok(found)
}

/// Check a proposed parent for `collection`
///
/// The parent must exist, belong to the same project, and must not be the
/// collection itself or one of its descendants.
pub async fn check_parent(
    conn: &mut SqliteConnection,
    project_id: Uuid,
    collection_id: Option<Uuid>,
    parent_id: Uuid,
) -> ApiResult<()> {
    let parent = db::collections::load_collection(&mut *conn, parent_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Parent collection not found: {}", parent_id)))?;

    if parent.project_id != project_id {
        return Err(ApiError::BadRequest(format!(
            "Parent collection {} belongs to another project",
            parent_id
        )));
    }

    if let Some(id) = collection_id {
        if id == parent_id {
            return Err(ApiError::BadRequest(
                "A collection cannot be its own parent".to_string(),
            ));
        }
        if descendants(conn, id).await?.iter().any(|c| c.id == parent_id) {
            return Err(ApiError::BadRequest(format!(
                "Moving collection {} under {} would create a cycle",
                id, parent_id
            )));
        }
    }

    Ok(())
}
