//! dcs-server library interface
//!
//! Exposes the router and services so integration tests can drive the
//! service in-process.

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{extract::DefaultBodyLimit, middleware, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::archive::ArchiveStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub archive: Arc<dyn ArchiveStore>,
    /// Where uploads wait until the archive worker picks them up
    pub staging_dir: PathBuf,
    pub session_lifetime: chrono::Duration,
    /// Request body cap for routes that carry uploaded files
    pub body_limit: usize,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        archive: Arc<dyn ArchiveStore>,
        staging_dir: PathBuf,
        session_lifetime: chrono::Duration,
    ) -> Self {
        Self {
            db,
            archive,
            staging_dir,
            session_lifetime,
            body_limit: services::deposit::request_body_limit(
                services::deposit::DEFAULT_MAX_FILE_BYTES,
            ),
            startup_time: Utc::now(),
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let uploads = DefaultBodyLimit::max(state.body_limit);

    Router::new()
        .merge(api::auth_routes())
        .merge(api::people_routes())
        .merge(api::project_routes())
        .merge(api::collection_routes().layer(uploads.clone()))
        .merge(api::item_routes().layer(uploads.clone()))
        .merge(api::deposit_routes())
        .merge(api::metadata_format_routes().layer(uploads))
        .merge(api::health_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
