//! Projects, collections and the metadata format registry

use dcs_common::model::{
    Collection, CollectionDraft, IngestRecord, MetadataFormat, MetadataFormatDraft, ObjectType,
    Person, Project, ProjectDraft,
};
use dcs_common::time;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::{authorization, hierarchy};

/// Every PI must be an approved person
async fn check_pis(pool: &SqlitePool, pi_ids: &[Uuid]) -> ApiResult<()> {
    for id in pi_ids {
        match db::people::load_person(pool, *id).await? {
            Some(person) if person.is_approved() => {}
            Some(_) => {
                return Err(ApiError::BadRequest(format!(
                    "Principal investigator {} is not an approved user",
                    id
                )))
            }
            None => {
                return Err(ApiError::BadRequest(format!(
                    "Principal investigator not found: {}",
                    id
                )))
            }
        }
    }
    Ok(())
}

fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

pub async fn create_project(
    pool: &SqlitePool,
    person: &Person,
    draft: &ProjectDraft,
) -> ApiResult<Project> {
    if !authorization::can_create_project(person) {
        return Err(ApiError::Forbidden(
            "Only administrators may create projects".to_string(),
        ));
    }
    draft.validate()?;
    check_pis(pool, &draft.pi_ids).await?;

    let project = Project {
        id: Uuid::new_v4(),
        name: draft.name.trim().to_string(),
        description: draft.description.clone(),
        start_date: draft.start_date,
        end_date: draft.end_date,
        pi_ids: dedup_ids(&draft.pi_ids),
        funding_entity: draft.funding_entity.clone(),
        award_numbers: draft.award_numbers.clone(),
        storage_allocated: draft.storage_allocated,
        storage_used: 0,
        created_at: time::now(),
    };

    db::projects::insert_project(pool, &project).await?;
    info!(project_id = %project.id, name = %project.name, created_by = %person.id, "Project created");
    Ok(project)
}

pub async fn update_project(
    pool: &SqlitePool,
    person: &Person,
    project_id: Uuid,
    draft: &ProjectDraft,
) -> ApiResult<Project> {
    let existing = authorization::require_project_manager(pool, person, project_id).await?;
    draft.validate()?;
    check_pis(pool, &draft.pi_ids).await?;

    if draft.storage_allocated != 0 && draft.storage_allocated < existing.storage_used {
        return Err(ApiError::BadRequest(format!(
            "Storage allocation {} is below the {} bytes already used",
            draft.storage_allocated, existing.storage_used
        )));
    }

    let project = Project {
        name: draft.name.trim().to_string(),
        description: draft.description.clone(),
        start_date: draft.start_date,
        end_date: draft.end_date,
        pi_ids: dedup_ids(&draft.pi_ids),
        funding_entity: draft.funding_entity.clone(),
        award_numbers: draft.award_numbers.clone(),
        storage_allocated: draft.storage_allocated,
        ..existing
    };

    db::projects::update_project(pool, &project).await?;
    info!(project_id = %project.id, updated_by = %person.id, "Project updated");
    Ok(project)
}

/// Projects visible in listings: everything for admins, PI projects otherwise
pub async fn list_projects(pool: &SqlitePool, person: &Person) -> ApiResult<Vec<Project>> {
    if person.is_admin() {
        Ok(db::projects::list_projects(pool).await?)
    } else {
        Ok(db::projects::list_projects_for_pi(pool, person.id).await?)
    }
}

/// Create a collection and queue it for archiving
pub async fn create_collection(
    pool: &SqlitePool,
    person: &Person,
    project_id: Uuid,
    draft: &CollectionDraft,
) -> ApiResult<(Collection, IngestRecord)> {
    let project = authorization::require_project_manager(pool, person, project_id).await?;
    draft.validate()?;

    let mut tx = pool.begin().await?;
    if let Some(parent_id) = draft.parent_id {
        hierarchy::check_parent(&mut *tx, project.id, None, parent_id).await?;
    }

    let collection = Collection {
        id: Uuid::new_v4(),
        project_id: project.id,
        parent_id: draft.parent_id,
        title: draft.title.trim().to_string(),
        summary: draft.summary.trim().to_string(),
        citable_locator: draft.citable_locator.clone(),
        publication_date: draft.publication_date,
        creators: draft.creators.clone(),
        contact_info: draft.contact_info.clone(),
        alternate_ids: draft.alternate_ids.clone(),
        created_at: time::now(),
    };
    let record = IngestRecord::new(ObjectType::Collection, collection.id);

    db::collections::insert_collection(&mut *tx, &collection).await?;
    db::ingest::insert_record(&mut *tx, &record).await?;
    tx.commit().await?;

    info!(
        collection_id = %collection.id,
        project_id = %project.id,
        deposit_id = %record.deposit_id,
        "Collection created"
    );
    Ok((collection, record))
}

pub async fn update_collection(
    pool: &SqlitePool,
    person: &Person,
    collection_id: Uuid,
    draft: &CollectionDraft,
) -> ApiResult<Collection> {
    let (existing, project) =
        authorization::require_collection_manager(pool, person, collection_id).await?;
    draft.validate()?;

    let collection = Collection {
        parent_id: draft.parent_id,
        title: draft.title.trim().to_string(),
        summary: draft.summary.trim().to_string(),
        citable_locator: draft.citable_locator.clone(),
        publication_date: draft.publication_date,
        creators: draft.creators.clone(),
        contact_info: draft.contact_info.clone(),
        alternate_ids: draft.alternate_ids.clone(),
        ..existing
    };

    // Write first so the cycle check runs under the write lock
    let mut tx = pool.begin().await?;
    db::collections::update_collection(&mut *tx, &collection).await?;
    if let Some(parent_id) = collection.parent_id {
        hierarchy::check_parent(&mut *tx, project.id, Some(collection.id), parent_id).await?;
    }
    tx.commit().await?;

    info!(collection_id = %collection.id, updated_by = %person.id, "Collection updated");
    Ok(collection)
}

/// Grant deposit rights on a collection
///
/// Returns the updated depositor list. Granting twice is not an error.
pub async fn add_depositor(
    pool: &SqlitePool,
    person: &Person,
    collection_id: Uuid,
    depositor_id: Uuid,
) -> ApiResult<Vec<Person>> {
    authorization::require_collection_manager(pool, person, collection_id).await?;

    let depositor = db::people::load_person(pool, depositor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Person not found: {}", depositor_id)))?;
    if !depositor.is_approved() {
        return Err(ApiError::BadRequest(format!(
            "Person {} is not an approved user",
            depositor_id
        )));
    }

    if db::depositors::add_depositor(pool, collection_id, depositor_id).await? {
        info!(collection_id = %collection_id, depositor = %depositor_id, granted_by = %person.id, "Depositor added");
    }
    Ok(db::depositors::list_depositors(pool, collection_id).await?)
}

pub async fn remove_depositor(
    pool: &SqlitePool,
    person: &Person,
    collection_id: Uuid,
    depositor_id: Uuid,
) -> ApiResult<()> {
    authorization::require_collection_manager(pool, person, collection_id).await?;

    if !db::depositors::remove_depositor(pool, collection_id, depositor_id).await? {
        return Err(ApiError::NotFound(format!(
            "Person {} is not a depositor of collection {}",
            depositor_id, collection_id
        )));
    }
    info!(collection_id = %collection_id, depositor = %depositor_id, removed_by = %person.id, "Depositor removed");
    Ok(())
}

pub async fn register_format(
    pool: &SqlitePool,
    person: &Person,
    draft: &MetadataFormatDraft,
) -> ApiResult<MetadataFormat> {
    authorization::require_admin(person)?;
    draft.validate()?;

    let name = draft.name.trim();
    let version = draft.version.trim();
    if db::metadata_formats::format_exists(pool, name, version).await? {
        return Err(ApiError::Conflict(format!(
            "Metadata format {} {} is already registered",
            name, version
        )));
    }

    let format = MetadataFormat {
        id: Uuid::new_v4(),
        name: name.to_string(),
        version: version.to_string(),
        schema_url: draft.schema_url.clone(),
        root_element: draft.root_element.trim().to_string(),
        namespace: draft
            .namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string),
        applies_to: draft.applies_to,
        validates: draft.validates,
        created_at: time::now(),
    };

    db::metadata_formats::insert_format(pool, &format).await?;
    info!(format_id = %format.id, name = %format.name, version = %format.version, "Metadata format registered");
    Ok(format)
}

pub async fn set_format_validation(
    pool: &SqlitePool,
    person: &Person,
    format_id: Uuid,
    validates: bool,
) -> ApiResult<MetadataFormat> {
    authorization::require_admin(person)?;

    if !db::metadata_formats::set_validates(pool, format_id, validates).await? {
        return Err(ApiError::NotFound(format!("Metadata format not found: {}", format_id)));
    }
    info!(format_id = %format_id, validates, "Metadata format validation toggled");

    db::metadata_formats::load_format(pool, format_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Metadata format not found: {}", format_id)))
}
