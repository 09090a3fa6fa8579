//! Deposit status and archived unit lookup

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use dcs_common::model::{IngestRecord, ObjectType};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::services::archive::{poll_until_complete, ArchivedUnit, PollError};
use crate::{db, ApiError, ApiResult, AppState};

/// Longest a status request may wait for a deposit to settle
const MAX_WAIT_MS: u64 = 30_000;
const WAIT_STEP_MS: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Wait up to this long for a terminal status before answering
    #[serde(default)]
    pub wait_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
}

/// GET /api/deposits/:id/status[?wait_ms=N]
///
/// Returns the ingest record. With `wait_ms`, re-checks every 100 ms until
/// the record is DEPOSITED or FAILED or the wait runs out, then returns the
/// latest state either way.
pub async fn deposit_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(deposit_id): ApiPath<Uuid>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<IngestRecord>> {
    session.require()?;

    let wait_ms = query.wait_ms.min(MAX_WAIT_MS);
    let attempts = (wait_ms / WAIT_STEP_MS) as u32 + 1;

    match poll_until_complete(
        &state.db,
        deposit_id,
        Duration::from_millis(WAIT_STEP_MS),
        attempts,
    )
    .await
    {
        Ok(record) => Ok(Json(record)),
        Err(PollError::TimedOut { last, .. }) => Ok(Json(*last)),
        Err(PollError::NotFound(id)) => {
            Err(ApiError::NotFound(format!("Deposit not found: {}", id)))
        }
        Err(PollError::Database(e)) => Err(e.into()),
    }
}

/// GET /api/objects/:id/deposits: every ingest record for one object
pub async fn object_deposits(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(object_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<IngestRecord>>> {
    session.require()?;
    Ok(Json(db::ingest::records_for_object(&state.db, object_id).await?))
}

/// GET /api/archive/units?type=DATA_ITEM (admin)
pub async fn list_units(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<UnitQuery>,
) -> ApiResult<Json<Vec<ArchivedUnit>>> {
    session.require_admin()?;
    Ok(Json(state.archive.list(query.object_type).await?))
}

/// GET /api/archive/units/:du_id (admin)
pub async fn view_unit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(du_id): ApiPath<String>,
) -> ApiResult<Json<ArchivedUnit>> {
    session.require_admin()?;
    state
        .archive
        .retrieve(&du_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Deliverable unit not found: {}", du_id)))
}

pub fn deposit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/deposits/:id/status", get(deposit_status))
        .route("/api/objects/:id/deposits", get(object_deposits))
        .route("/api/archive/units", get(list_units))
        .route("/api/archive/units/:du_id", get(view_unit))
}
