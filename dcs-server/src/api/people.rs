//! People administration: listings, approval, roles

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use dcs_common::model::{Person, RegistrationStatus, Role};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::services::{accounts, authorization};
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PeopleQuery {
    pub status: Option<RegistrationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RolesRequest {
    pub roles: Vec<Role>,
}

/// GET /api/people[?status=PENDING|APPROVED|DECLINED] (admin)
pub async fn list_people(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeopleQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    session.require_admin()?;
    Ok(Json(db::people::list_people(&state.db, query.status).await?))
}

/// GET /api/people/pending (admin)
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Person>>> {
    session.require_admin()?;
    Ok(Json(
        db::people::list_people(&state.db, Some(RegistrationStatus::Pending)).await?,
    ))
}

/// GET /api/people/:id (self or admin)
pub async fn view_person(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(person_id): ApiPath<Uuid>,
) -> ApiResult<Json<Person>> {
    let viewer = session.require()?;
    if !authorization::can_view_profile(viewer, person_id) {
        return Err(ApiError::Forbidden(
            "Profiles are visible to their owner and administrators".to_string(),
        ));
    }
    db::people::load_person(&state.db, person_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Person not found: {}", person_id)))
}

/// POST /api/people/:id/approve (admin)
pub async fn approve(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(person_id): ApiPath<Uuid>,
) -> ApiResult<Json<Person>> {
    session.require_admin()?;
    let person =
        accounts::set_registration_status(&state.db, person_id, RegistrationStatus::Approved)
            .await?;
    Ok(Json(person))
}

/// POST /api/people/:id/decline (admin)
pub async fn decline(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(person_id): ApiPath<Uuid>,
) -> ApiResult<Json<Person>> {
    let admin = session.require_admin()?;
    if admin.id == person_id {
        return Err(ApiError::BadRequest(
            "Administrators cannot decline their own registration".to_string(),
        ));
    }
    let person =
        accounts::set_registration_status(&state.db, person_id, RegistrationStatus::Declined)
            .await?;
    Ok(Json(person))
}

/// PUT /api/people/:id/roles (admin)
pub async fn set_roles(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(person_id): ApiPath<Uuid>,
    payload: Result<Json<RolesRequest>, JsonRejection>,
) -> ApiResult<Json<Person>> {
    let admin = session.require_admin()?;
    let Json(request) = payload?;
    if admin.id == person_id && !request.roles.contains(&Role::Admin) {
        return Err(ApiError::BadRequest(
            "Administrators cannot remove their own admin role".to_string(),
        ));
    }
    Ok(Json(accounts::set_roles(&state.db, person_id, request.roles).await?))
}

pub fn people_routes() -> Router<AppState> {
    Router::new()
        .route("/api/people", get(list_people))
        .route("/api/people/pending", get(list_pending))
        .route("/api/people/:id", get(view_person))
        .route("/api/people/:id/approve", post(approve))
        .route("/api/people/:id/decline", post(decline))
        .route("/api/people/:id/roles", put(set_roles))
}
