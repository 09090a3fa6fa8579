//! Metadata format registry endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dcs_common::model::{MetadataFormat, MetadataFormatDraft};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::services::{catalog, metadata_validator};
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ValidationToggle {
    pub validates: bool,
}

#[derive(Debug, Deserialize)]
pub struct DocumentCheck {
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentCheckResult {
    pub valid: bool,
    pub root_element: String,
    pub namespace: Option<String>,
}

async fn load(state: &AppState, format_id: Uuid) -> ApiResult<MetadataFormat> {
    db::metadata_formats::load_format(&state.db, format_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Metadata format not found: {}", format_id)))
}

/// GET /api/metadata-formats
pub async fn list_formats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<MetadataFormat>>> {
    session.require()?;
    Ok(Json(db::metadata_formats::list_formats(&state.db).await?))
}

/// POST /api/metadata-formats (admin); 409 for a duplicate name and version
pub async fn register_format(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<MetadataFormatDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MetadataFormat>)> {
    let person = session.require()?;
    let Json(draft) = payload?;
    let format = catalog::register_format(&state.db, person, &draft).await?;
    Ok((StatusCode::CREATED, Json(format)))
}

/// GET /api/metadata-formats/:id
pub async fn view_format(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(format_id): ApiPath<Uuid>,
) -> ApiResult<Json<MetadataFormat>> {
    session.require()?;
    Ok(Json(load(&state, format_id).await?))
}

/// PUT /api/metadata-formats/:id/validation (admin)
pub async fn set_validation(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(format_id): ApiPath<Uuid>,
    payload: Result<Json<ValidationToggle>, JsonRejection>,
) -> ApiResult<Json<MetadataFormat>> {
    let person = session.require()?;
    let Json(toggle) = payload?;
    Ok(Json(
        catalog::set_format_validation(&state.db, person, format_id, toggle.validates).await?,
    ))
}

/// POST /api/metadata-formats/:id/validate
///
/// Dry run of the attachment check. 200 when the document passes, 400 with
/// the reason otherwise.
pub async fn validate_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(format_id): ApiPath<Uuid>,
    payload: Result<Json<DocumentCheck>, JsonRejection>,
) -> ApiResult<Json<DocumentCheckResult>> {
    session.require()?;
    let Json(check) = payload?;
    let format = load(&state, format_id).await?;

    let bytes = BASE64
        .decode(check.content_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("Document is not valid base64: {}", e)))?;
    let root = metadata_validator::validate(&format, &bytes)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(DocumentCheckResult {
        valid: true,
        root_element: root.local_name,
        namespace: root.namespace,
    }))
}

pub fn metadata_format_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/metadata-formats",
            get(list_formats).post(register_format),
        )
        .route("/api/metadata-formats/:id", get(view_format))
        .route("/api/metadata-formats/:id/validation", put(set_validation))
        .route("/api/metadata-formats/:id/validate", post(validate_document))
}
