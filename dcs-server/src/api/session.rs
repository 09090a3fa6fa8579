//! Bearer-token session resolution
//!
//! Every request passes through [`session_middleware`], which resolves an
//! `Authorization: Bearer <token>` header to the logged-in person and
//! stores a [`Session`] extension. Anonymous requests get an empty session;
//! handlers that need a user call [`Session::require`], which yields 401.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dcs_common::model::Person;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub person: Option<Person>,
    pub token: Option<String>,
}

impl Session {
    /// The logged-in person, or 401
    pub fn require(&self) -> ApiResult<&Person> {
        self.person.as_ref().ok_or(ApiError::Unauthorized)
    }

    /// The logged-in person if they are an admin; 401 anonymous, 403 otherwise
    pub fn require_admin(&self) -> ApiResult<&Person> {
        let person = self.require()?;
        crate::services::authorization::require_admin(person)?;
        Ok(person)
    }
}

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

async fn resolve(state: &AppState, token: &str) -> ApiResult<Option<Person>> {
    let Some(person_id) = db::sessions::lookup_session(&state.db, token).await? else {
        return Ok(None);
    };
    let person = db::people::load_person(&state.db, person_id).await?;
    Ok(person.filter(Person::is_approved))
}

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers());

    let person = match &token {
        Some(token) => match resolve(&state, token).await {
            Ok(person) => person,
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    if token.is_some() && person.is_none() {
        debug!(path = %request.uri().path(), "Ignoring unknown or expired session token");
    }

    request.extensions_mut().insert(Session { person, token });
    next.run(request).await
}
