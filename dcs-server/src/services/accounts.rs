//! Registration, login and the bootstrap administrator

use chrono::Duration;
use dcs_common::api::auth::{generate_salt, hash_password, verify_password, MIN_PASSWORD_LEN};
use dcs_common::config::BootstrapAdmin;
use dcs_common::model::{Person, RegistrationStatus, Role};
use dcs_common::time;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::db::people::Credentials;
use crate::db::sessions::IssuedSession;
use crate::error::{ApiError, ApiResult};

/// Self-registration form
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_names: String,
    pub last_names: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Registration {
    fn validate(&self) -> ApiResult<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@')
        {
            return Err(ApiError::BadRequest(format!("Invalid email address: {:?}", self.email)));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.first_names.trim().is_empty() || self.last_names.trim().is_empty() {
            return Err(ApiError::BadRequest("First and last names are required".to_string()));
        }
        Ok(())
    }
}

async fn create_person(
    pool: &SqlitePool,
    registration: &Registration,
    roles: Vec<Role>,
    status: RegistrationStatus,
) -> ApiResult<Person> {
    registration.validate()?;

    if db::people::email_exists(pool, &registration.email).await? {
        return Err(ApiError::Conflict(format!(
            "Email already registered: {}",
            registration.email.trim()
        )));
    }

    let mut person = db::people::new_person(
        &registration.email,
        &registration.first_names,
        &registration.last_names,
        registration.phone_number.clone(),
        time::now(),
    );
    person.roles = roles;
    person.registration_status = status;

    let salt = generate_salt();
    let credentials = Credentials {
        password_hash: hash_password(&registration.password, &salt),
        password_salt: salt,
    };

    store_person(pool, &person, &credentials).await?;
    Ok(person)
}

fn is_duplicate_email(err: &dcs_common::Error) -> bool {
    matches!(
        err,
        dcs_common::Error::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
    )
}

/// Person row and roles in one transaction; a taken email is a 409
async fn store_person(
    pool: &SqlitePool,
    person: &Person,
    credentials: &Credentials,
) -> ApiResult<()> {
    let mut tx = pool.begin().await?;
    match db::people::insert_person(&mut *tx, person, credentials).await {
        Ok(()) => {}
        Err(e) if is_duplicate_email(&e) => {
            return Err(ApiError::Conflict(format!(
                "Email already registered: {}",
                person.email
            )));
        }
        Err(e) => return Err(e.into()),
    }
    tx.commit().await?;
    Ok(())
}

/// Register a new person; they stay PENDING until an admin approves
pub async fn register(pool: &SqlitePool, registration: &Registration) -> ApiResult<Person> {
    let person = create_person(
        pool,
        registration,
        vec![Role::User],
        RegistrationStatus::Pending,
    )
    .await?;

    info!(person_id = %person.id, email = %person.email, "Registration received");
    Ok(person)
}

/// Verify credentials and open a session
///
/// Every failure is a 401. Unknown email and wrong password share one
/// message; unapproved registrations are told their status.
pub async fn login(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    lifetime: Duration,
) -> ApiResult<(Person, IssuedSession)> {
    let failed = || ApiError::LoginFailed("Invalid email or password".to_string());

    let (person, credentials) = db::people::find_by_email(pool, email)
        .await?
        .ok_or_else(failed)?;

    if !verify_password(password, &credentials.password_salt, &credentials.password_hash) {
        warn!(email = %email, "Login rejected: bad password");
        return Err(failed());
    }

    if !person.is_approved() {
        warn!(
            person_id = %person.id,
            status = %person.registration_status,
            "Login rejected: registration not approved"
        );
        return Err(ApiError::LoginFailed(format!(
            "Registration is {}",
            person.registration_status.as_str().to_lowercase()
        )));
    }

    let purged = db::sessions::purge_expired(pool).await?;
    if purged > 0 {
        debug!(purged, "Removed expired sessions");
    }

    let session = db::sessions::create_session(pool, person.id, lifetime).await?;
    info!(person_id = %person.id, "Login succeeded");
    Ok((person, session))
}

/// Resolve an admin decision on a registration
pub async fn set_registration_status(
    pool: &SqlitePool,
    person_id: Uuid,
    status: RegistrationStatus,
) -> ApiResult<Person> {
    if !db::people::set_status(pool, person_id, status).await? {
        return Err(ApiError::NotFound(format!("Person not found: {}", person_id)));
    }

    if status != RegistrationStatus::Approved {
        let dropped = db::sessions::delete_sessions_for(pool, person_id).await?;
        if dropped > 0 {
            info!(person_id = %person_id, dropped, "Revoked sessions");
        }
    }

    info!(person_id = %person_id, status = %status, "Registration status updated");

    db::people::load_person(pool, person_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Person not found: {}", person_id)))
}

/// Replace a person's roles; every person keeps at least USER
pub async fn set_roles(pool: &SqlitePool, person_id: Uuid, mut roles: Vec<Role>) -> ApiResult<Person> {
    if db::people::load_person(pool, person_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Person not found: {}", person_id)));
    }
    if !roles.contains(&Role::User) {
        roles.push(Role::User);
    }
    roles.sort_by_key(|r| r.as_str());
    roles.dedup();

    db::people::set_roles(pool, person_id, &roles).await?;

    db::people::load_person(pool, person_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Person not found: {}", person_id)))
}

/// Create the configured administrator when no admin exists yet
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    admin: &BootstrapAdmin,
) -> ApiResult<Option<Person>> {
    if db::people::admin_exists(pool).await? {
        return Ok(None);
    }

    let registration = Registration {
        email: admin.email.clone(),
        password: admin.password.clone(),
        first_names: admin.first_names.clone(),
        last_names: admin.last_names.clone(),
        phone_number: None,
    };

    let person = create_person(
        pool,
        &registration,
        vec![Role::Admin, Role::User],
        RegistrationStatus::Approved,
    )
    .await?;

    info!(person_id = %person.id, email = %person.email, "Created bootstrap administrator");
    Ok(Some(person))
}
