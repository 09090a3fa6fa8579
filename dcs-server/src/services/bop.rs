//! Business object package export
//!
//! Bundles a project or collection subtree with the data items, metadata
//! files and people it references. People are exported as summaries so
//! packages never carry credentials or registration state.
//!
//! Exports follow the view rules of the records inside them: project
//! records need a signed-in viewer, and people need an administrator or
//! a PI of the exported project.

use dcs_common::model::{
    BusinessObjectPackage, Collection, DataItem, MetadataFile, Person, PersonSummary, Project,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db;
use crate::error::ApiResult;
use crate::services::{authorization, hierarchy};

/// Collects people by id without duplicates
#[derive(Default)]
struct PeopleIndex {
    seen: HashSet<Uuid>,
    people: Vec<PersonSummary>,
}

impl PeopleIndex {
    async fn add(&mut self, pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
        if !self.seen.insert(id) {
            return Ok(());
        }
        if let Some(person) = db::people::load_person(pool, id).await? {
            self.people.push(person.summary());
        }
        Ok(())
    }
}

async fn add_collections(
    pool: &SqlitePool,
    package: &mut BusinessObjectPackage,
    people: &mut PeopleIndex,
    collections: Vec<Collection>,
) -> ApiResult<()> {
    for collection in collections {
        for depositor in db::depositors::list_depositors(pool, collection.id).await? {
            people.add(pool, depositor.id).await?;
        }
        for item in db::items::list_all_items(pool, collection.id).await? {
            people.add(pool, item.depositor_id).await?;
            package.data_items.push(item);
        }
        package
            .metadata_files
            .extend(db::items::list_metadata_files(pool, collection.id).await?);
        package.collections.push(collection);
    }
    Ok(())
}

/// Drop the parts of an export the viewer may not see
fn restrict_to_viewer(
    mut package: BusinessObjectPackage,
    project: &Project,
    viewer: Option<&Person>,
) -> BusinessObjectPackage {
    match viewer {
        None => {
            package.projects.clear();
            package.people.clear();
        }
        Some(person) if !authorization::can_manage_project(person, project) => {
            package.people.clear();
        }
        Some(_) => {}
    }
    package
}

/// A project with every collection, item and metadata file under it
pub async fn export_project(
    pool: &SqlitePool,
    project_id: Uuid,
    viewer: Option<&Person>,
) -> ApiResult<BusinessObjectPackage> {
    let project = authorization::load_project(pool, project_id).await?;

    let mut package = BusinessObjectPackage::new();
    let mut people = PeopleIndex::default();

    for pi in &project.pi_ids {
        people.add(pool, *pi).await?;
    }

    let collections = db::collections::list_by_project(pool, project_id).await?;
    add_collections(pool, &mut package, &mut people, collections).await?;

    package.people = people.people;
    package.projects.push(project.clone());
    Ok(restrict_to_viewer(package, &project, viewer))
}

/// A collection plus all of its descendants and their items
pub async fn export_collection(
    pool: &SqlitePool,
    collection_id: Uuid,
    viewer: Option<&Person>,
) -> ApiResult<BusinessObjectPackage> {
    let root = authorization::load_collection(pool, collection_id).await?;
    let project = authorization::load_project(pool, root.project_id).await?;

    let mut package = BusinessObjectPackage::new();
    let mut people = PeopleIndex::default();

    for pi in &project.pi_ids {
        people.add(pool, *pi).await?;
    }

    let mut collections = vec![root];
    let mut conn = pool.acquire().await?;
    collections.extend(hierarchy::descendants(&mut conn, collection_id).await?);
    drop(conn);
    add_collections(pool, &mut package, &mut people, collections).await?;

    package.people = people.people;
    package.projects.push(project.clone());
    Ok(restrict_to_viewer(package, &project, viewer))
}

/// Package describing a single deposited item (archive manifest)
pub async fn item_package(pool: &SqlitePool, item: &DataItem) -> ApiResult<BusinessObjectPackage> {
    let collection = authorization::load_collection(pool, item.collection_id).await?;

    let mut package = BusinessObjectPackage::new();
    let mut people = PeopleIndex::default();
    people.add(pool, item.depositor_id).await?;

    package.collections.push(collection);
    package.data_items.push(item.clone());
    package.people = people.people;
    Ok(package)
}

/// Package describing a single collection without its contents
pub async fn collection_package(
    pool: &SqlitePool,
    collection: &Collection,
) -> ApiResult<BusinessObjectPackage> {
    let project = authorization::load_project(pool, collection.project_id).await?;

    let mut package = BusinessObjectPackage::new();
    let mut people = PeopleIndex::default();
    for pi in &project.pi_ids {
        people.add(pool, *pi).await?;
    }

    package.projects.push(project);
    package.collections.push(collection.clone());
    package.people = people.people;
    Ok(package)
}

/// Package describing a metadata file and the collection it documents
pub async fn metadata_package(
    pool: &SqlitePool,
    file: &MetadataFile,
) -> ApiResult<BusinessObjectPackage> {
    let collection = authorization::load_collection(pool, file.collection_id).await?;

    let mut package = BusinessObjectPackage::new();
    package.collections.push(collection);
    package.metadata_files.push(file.clone());
    Ok(package)
}
