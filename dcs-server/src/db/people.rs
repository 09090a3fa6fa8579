//! People, roles and credentials

use chrono::{DateTime, Utc};
use dcs_common::model::{Person, RegistrationStatus, Role};
use dcs_common::time;
use dcs_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

/// Stored credentials for a person
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password_hash: String,
    pub password_salt: String,
}

const PERSON_COLUMNS: &str = "id, email, first_names, last_names, phone_number, \
                              registration_status, created_at";

/// Insert a person and their roles
pub async fn insert_person(
    conn: &mut SqliteConnection,
    person: &Person,
    credentials: &Credentials,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO people (
            id, email, password_hash, password_salt, first_names, last_names,
            phone_number, registration_status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(person.id.to_string())
    .bind(&person.email)
    .bind(&credentials.password_hash)
    .bind(&credentials.password_salt)
    .bind(&person.first_names)
    .bind(&person.last_names)
    .bind(&person.phone_number)
    .bind(person.registration_status.as_str())
    .bind(time::to_db(&person.created_at))
    .execute(&mut *conn)
    .await?;

    replace_roles(conn, person.id, &person.roles).await
}

async fn replace_roles(conn: &mut SqliteConnection, person_id: Uuid, roles: &[Role]) -> Result<()> {
    sqlx::query("DELETE FROM person_roles WHERE person_id = ?")
        .bind(person_id.to_string())
        .execute(&mut *conn)
        .await?;

    for role in roles {
        sqlx::query("INSERT OR IGNORE INTO person_roles (person_id, role) VALUES (?, ?)")
            .bind(person_id.to_string())
            .bind(role.as_str())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Replace a person's roles atomically
pub async fn set_roles(pool: &SqlitePool, person_id: Uuid, roles: &[Role]) -> Result<()> {
    let mut tx = pool.begin().await?;
    replace_roles(&mut *tx, person_id, roles).await?;
    tx.commit().await?;
    Ok(())
}

async fn load_roles(pool: &SqlitePool, person_id: &str) -> Result<Vec<Role>> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT role FROM person_roles WHERE person_id = ? ORDER BY role")
            .bind(person_id)
            .fetch_all(pool)
            .await?;

    rows.iter().map(|r| r.parse()).collect()
}

async fn person_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<Person> {
    let id: String = row.get("id");
    let status: String = row.get("registration_status");
    let created_at: String = row.get("created_at");
    let roles = load_roles(pool, &id).await?;

    Ok(Person {
        id: parse_uuid("person", &id)?,
        email: row.get("email"),
        first_names: row.get("first_names"),
        last_names: row.get("last_names"),
        phone_number: row.get("phone_number"),
        roles,
        registration_status: status.parse()?,
        created_at: time::from_db("created_at", &created_at)?,
    })
}

pub async fn load_person(pool: &SqlitePool, id: Uuid) -> Result<Option<Person>> {
    let row = sqlx::query(&format!("SELECT {} FROM people WHERE id = ?", PERSON_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(person_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Look up a person by email (case-insensitive) together with credentials
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<(Person, Credentials)>> {
    let row = sqlx::query(&format!(
        "SELECT {}, password_hash, password_salt FROM people WHERE email = ? COLLATE NOCASE",
        PERSON_COLUMNS
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let person = person_from_row(pool, &row).await?;
            let credentials = Credentials {
                password_hash: row.get("password_hash"),
                password_salt: row.get("password_salt"),
            };
            Ok(Some((person, credentials)))
        }
        None => Ok(None),
    }
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM people WHERE email = ? COLLATE NOCASE)",
    )
    .bind(email.trim())
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// List people, optionally restricted to one registration status
pub async fn list_people(
    pool: &SqlitePool,
    status: Option<RegistrationStatus>,
) -> Result<Vec<Person>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(&format!(
                "SELECT {} FROM people WHERE registration_status = ? ORDER BY created_at, email",
                PERSON_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM people ORDER BY created_at, email",
                PERSON_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    let mut people = Vec::with_capacity(rows.len());
    for row in &rows {
        people.push(person_from_row(pool, row).await?);
    }
    Ok(people)
}

/// Update registration status; false if the person does not exist
pub async fn set_status(
    pool: &SqlitePool,
    person_id: Uuid,
    status: RegistrationStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE people SET registration_status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(person_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn admin_exists(pool: &SqlitePool) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM person_roles WHERE role = ?)",
    )
    .bind(Role::Admin.as_str())
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Build a new person record with default role and status
pub fn new_person(
    email: &str,
    first_names: &str,
    last_names: &str,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
) -> Person {
    Person {
        id: Uuid::new_v4(),
        email: email.trim().to_string(),
        first_names: first_names.trim().to_string(),
        last_names: last_names.trim().to_string(),
        phone_number,
        roles: vec![Role::User],
        registration_status: RegistrationStatus::Pending,
        created_at,
    }
}
