//! Authorization policy
//!
//! A flat model: admins may do everything, principal investigators manage
//! their own project and its collections, and depositors are a
//! per-collection allow-list. The pure `can_*` functions hold the policy;
//! the async `require_*` helpers load what they need and turn a refusal
//! into the right HTTP error.

use dcs_common::model::{Collection, Person, Project};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};

pub fn can_create_project(person: &Person) -> bool {
    person.is_admin()
}

pub fn can_manage_project(person: &Person, project: &Project) -> bool {
    person.is_admin() || project.is_pi(person.id)
}

/// Depositors are checked against the allow-list by the caller
pub fn can_deposit(person: &Person, project: &Project, on_allow_list: bool) -> bool {
    person.is_approved() && (can_manage_project(person, project) || on_allow_list)
}

pub fn can_view_profile(viewer: &Person, subject_id: Uuid) -> bool {
    viewer.is_admin() || viewer.id == subject_id
}

pub fn require_admin(person: &Person) -> ApiResult<()> {
    if person.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Administrator role required".to_string()))
    }
}

pub async fn load_project(pool: &SqlitePool, project_id: Uuid) -> ApiResult<Project> {
    db::projects::load_project(pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project not found: {}", project_id)))
}

pub async fn load_collection(pool: &SqlitePool, collection_id: Uuid) -> ApiResult<Collection> {
    db::collections::load_collection(pool, collection_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Collection not found: {}", collection_id)))
}

/// Load a project and check the person may manage it
pub async fn require_project_manager(
    pool: &SqlitePool,
    person: &Person,
    project_id: Uuid,
) -> ApiResult<Project> {
    let project = load_project(pool, project_id).await?;
    if !can_manage_project(person, &project) {
        return Err(ApiError::Forbidden(format!(
            "Not an administrator of project {}",
            project_id
        )));
    }
    Ok(project)
}

/// Load a collection and check the person may manage its project
pub async fn require_collection_manager(
    pool: &SqlitePool,
    person: &Person,
    collection_id: Uuid,
) -> ApiResult<(Collection, Project)> {
    let collection = load_collection(pool, collection_id).await?;
    let project = load_project(pool, collection.project_id).await?;
    if !can_manage_project(person, &project) {
        return Err(ApiError::Forbidden(format!(
            "Not an administrator of the project owning collection {}",
            collection_id
        )));
    }
    Ok((collection, project))
}

/// Whether the person may deposit into the collection
pub async fn check_deposit(
    pool: &SqlitePool,
    person: &Person,
    collection: &Collection,
    project: &Project,
) -> ApiResult<bool> {
    if can_manage_project(person, project) {
        return Ok(person.is_approved());
    }
    let listed = db::depositors::is_depositor(pool, collection.id, person.id).await?;
    Ok(can_deposit(person, project, listed))
}

/// Load a collection and check the person may deposit into it
pub async fn require_depositor(
    pool: &SqlitePool,
    person: &Person,
    collection_id: Uuid,
) -> ApiResult<(Collection, Project)> {
    let collection = load_collection(pool, collection_id).await?;
    let project = load_project(pool, collection.project_id).await?;
    if !check_deposit(pool, person, &collection, &project).await? {
        return Err(ApiError::Forbidden(format!(
            "Not authorized to deposit into collection {}",
            collection_id
        )));
    }
    Ok((collection, project))
}

/// Collections the person may deposit into
pub async fn depositable_collections(pool: &SqlitePool, person: &Person) -> ApiResult<Vec<Collection>> {
    if !person.is_approved() {
        return Ok(Vec::new());
    }

    let projects = if person.is_admin() {
        db::projects::list_projects(pool).await?
    } else {
        db::projects::list_projects_for_pi(pool, person.id).await?
    };

    let mut collections = Vec::new();
    for project in &projects {
        collections.extend(db::collections::list_by_project(pool, project.id).await?);
    }

    for id in db::depositors::collections_for(pool, person.id).await? {
        if collections.iter().any(|c| c.id == id) {
            continue;
        }
        if let Some(c) = db::collections::load_collection(pool, id).await? {
            collections.push(c);
        }
    }

    Ok(collections)
}
