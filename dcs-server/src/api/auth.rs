//! Registration, login and logout

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use dcs_common::model::Person;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::session::Session;
use crate::services::accounts::{self, Registration};
use crate::{db, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub person: Person,
}

/// POST /api/auth/register
///
/// 201 with the PENDING person; 400 invalid form; 409 duplicate email.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    let Json(registration) = payload?;
    let person = accounts::register(&state.db, &registration).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let (person, session) =
        accounts::login(&state.db, &request.email, &request.password, state.session_lifetime)
            .await?;

    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        person,
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Value>> {
    let person = session.require()?;
    if let Some(token) = &session.token {
        db::sessions::delete_session(&state.db, token).await?;
    }
    info!(person_id = %person.id, "Logged out");
    Ok(Json(json!({ "status": "logged_out" })))
}

/// GET /api/auth/me
pub async fn me(Extension(session): Extension<Session>) -> ApiResult<Json<Person>> {
    Ok(Json(session.require()?.clone()))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
