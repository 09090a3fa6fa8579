//! Collection endpoints: view, update, hierarchy, depositors, metadata

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use dcs_common::model::{BusinessObjectPackage, Collection, CollectionDraft, MetadataFile, Person};
use serde::Serialize;
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::services::deposit::{self, DepositReceipt, MetadataRequest};
use crate::services::{authorization, bop, catalog, hierarchy};
use crate::{db, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct AttachedMetadata {
    pub metadata_file: MetadataFile,
    pub deposit: DepositReceipt,
}

/// GET /api/collections/:id (public)
pub async fn view_collection(
    State(state): State<AppState>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<Collection>> {
    Ok(Json(authorization::load_collection(&state.db, collection_id).await?))
}

/// PUT /api/collections/:id (admin or project PI)
pub async fn update_collection(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(collection_id): ApiPath<Uuid>,
    payload: Result<Json<CollectionDraft>, JsonRejection>,
) -> ApiResult<Json<Collection>> {
    let person = session.require()?;
    let Json(draft) = payload?;
    Ok(Json(
        catalog::update_collection(&state.db, person, collection_id, &draft).await?,
    ))
}

/// GET /api/collections/:id/children (public)
pub async fn children(
    State(state): State<AppState>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Collection>>> {
    authorization::load_collection(&state.db, collection_id).await?;
    Ok(Json(db::collections::children(&state.db, collection_id).await?))
}

/// GET /api/collections/:id/ancestors (public), nearest parent first
pub async fn ancestors(
    State(state): State<AppState>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Collection>>> {
    let collection = authorization::load_collection(&state.db, collection_id).await?;
    Ok(Json(hierarchy::ancestors(&state.db, &collection).await?))
}

/// GET /api/collections/:id/bop (public; project and people need a session)
pub async fn export_collection(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<BusinessObjectPackage>> {
    Ok(Json(
        bop::export_collection(&state.db, collection_id, session.person.as_ref()).await?,
    ))
}

/// GET /api/collections/:id/depositors (admin or project PI)
pub async fn list_depositors(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Person>>> {
    let person = session.require()?;
    authorization::require_collection_manager(&state.db, person, collection_id).await?;
    Ok(Json(db::depositors::list_depositors(&state.db, collection_id).await?))
}

/// PUT /api/collections/:id/depositors/:person_id
pub async fn add_depositor(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath((collection_id, person_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Person>>> {
    let person = session.require()?;
    Ok(Json(
        catalog::add_depositor(&state.db, person, collection_id, person_id).await?,
    ))
}

/// DELETE /api/collections/:id/depositors/:person_id
pub async fn remove_depositor(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath((collection_id, person_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let person = session.require()?;
    catalog::remove_depositor(&state.db, person, collection_id, person_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/collections/:id/metadata (public)
pub async fn list_metadata(
    State(state): State<AppState>,
    ApiPath(collection_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<MetadataFile>>> {
    authorization::load_collection(&state.db, collection_id).await?;
    Ok(Json(db::items::list_metadata_files(&state.db, collection_id).await?))
}

/// POST /api/collections/:id/metadata (admin or project PI)
///
/// 202 once the document has validated and been queued for archiving.
pub async fn attach_metadata(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(collection_id): ApiPath<Uuid>,
    payload: Result<Json<MetadataRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AttachedMetadata>)> {
    let person = session.require()?;
    let Json(request) = payload?;
    let (metadata_file, record) =
        deposit::attach_metadata(&state.db, &state.staging_dir, person, collection_id, &request)
            .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AttachedMetadata {
            metadata_file,
            deposit: DepositReceipt::from(&record),
        }),
    ))
}

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/collections/:id",
            get(view_collection).put(update_collection),
        )
        .route("/api/collections/:id/children", get(children))
        .route("/api/collections/:id/ancestors", get(ancestors))
        .route("/api/collections/:id/bop", get(export_collection))
        .route("/api/collections/:id/depositors", get(list_depositors))
        .route(
            "/api/collections/:id/depositors/:person_id",
            put(add_depositor).delete(remove_depositor),
        )
        .route(
            "/api/collections/:id/metadata",
            get(list_metadata).post(attach_metadata),
        )
}
