//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use dcs_common::model::IngestStatus;
use serde::Serialize;
use tracing::warn;

use crate::{db, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database cannot be queried
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Deposits waiting for the archive worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_deposits: Option<i64>,
}

/// GET /health (public)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let pending = db::ingest::count_by_status(&state.db, IngestStatus::Pending).await;
    let (status, pending_deposits) = match pending {
        Ok(count) => ("ok", Some(count)),
        Err(e) => {
            warn!(error = %e, "Health check could not query the database");
            ("degraded", None)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "dcs-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        pending_deposits,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
