//! Project endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use dcs_common::model::{BusinessObjectPackage, Collection, CollectionDraft, Project, ProjectDraft};
use serde::Serialize;
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::services::deposit::DepositReceipt;
use crate::services::{authorization, bop, catalog};
use crate::{db, ApiResult, AppState};

/// Response for a newly created collection
#[derive(Debug, Serialize)]
pub struct CreatedCollection {
    pub collection: Collection,
    pub deposit: DepositReceipt,
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Project>>> {
    let person = session.require()?;
    Ok(Json(catalog::list_projects(&state.db, person).await?))
}

/// POST /api/projects (admin)
pub async fn create_project(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<ProjectDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let person = session.require()?;
    let Json(draft) = payload?;
    let project = catalog::create_project(&state.db, person, &draft).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:id
pub async fn view_project(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<Project>> {
    session.require()?;
    Ok(Json(authorization::load_project(&state.db, project_id).await?))
}

/// PUT /api/projects/:id (admin or project PI)
pub async fn update_project(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(project_id): ApiPath<Uuid>,
    payload: Result<Json<ProjectDraft>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let person = session.require()?;
    let Json(draft) = payload?;
    Ok(Json(
        catalog::update_project(&state.db, person, project_id, &draft).await?,
    ))
}

/// GET /api/projects/:id/collections (public)
pub async fn list_collections(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Collection>>> {
    authorization::load_project(&state.db, project_id).await?;
    Ok(Json(db::collections::list_by_project(&state.db, project_id).await?))
}

/// POST /api/projects/:id/collections (admin or project PI)
///
/// 201 with the collection and the ingest record queued for it.
pub async fn create_collection(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(project_id): ApiPath<Uuid>,
    payload: Result<Json<CollectionDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedCollection>)> {
    let person = session.require()?;
    let Json(draft) = payload?;
    let (collection, record) =
        catalog::create_collection(&state.db, person, project_id, &draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedCollection {
            collection,
            deposit: DepositReceipt::from(&record),
        }),
    ))
}

/// GET /api/projects/:id/bop
pub async fn export_project(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<Json<BusinessObjectPackage>> {
    let person = session.require()?;
    Ok(Json(
        bop::export_project(&state.db, project_id, Some(person)).await?,
    ))
}

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:id", get(view_project).put(update_project))
        .route(
            "/api/projects/:id/collections",
            get(list_collections).post(create_collection),
        )
        .route("/api/projects/:id/bop", get(export_project))
}
