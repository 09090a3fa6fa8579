//! Projects and their principal investigators

use dcs_common::model::Project;
use dcs_common::time;
use dcs_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_json, parse_uuid, to_json};

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date, funding_entity, \
                               award_numbers, storage_allocated, storage_used, created_at";

pub async fn insert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    let award_numbers = to_json("award_numbers", &project.award_numbers)?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO projects (
            id, name, description, start_date, end_date, funding_entity,
            award_numbers, storage_allocated, storage_used, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.start_date.map(|d| d.to_string()))
    .bind(project.end_date.map(|d| d.to_string()))
    .bind(&project.funding_entity)
    .bind(award_numbers)
    .bind(project.storage_allocated)
    .bind(project.storage_used)
    .bind(time::to_db(&project.created_at))
    .execute(&mut *tx)
    .await?;

    replace_pis(&mut *tx, project.id, &project.pi_ids).await?;
    tx.commit().await?;
    Ok(())
}

/// Update editable fields; storage_used and created_at are not touched
pub async fn update_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    let award_numbers = to_json("award_numbers", &project.award_numbers)?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE projects SET
            name = ?, description = ?, start_date = ?, end_date = ?,
            funding_entity = ?, award_numbers = ?, storage_allocated = ?
        WHERE id = ?
        "#,
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.start_date.map(|d| d.to_string()))
    .bind(project.end_date.map(|d| d.to_string()))
    .bind(&project.funding_entity)
    .bind(award_numbers)
    .bind(project.storage_allocated)
    .bind(project.id.to_string())
    .execute(&mut *tx)
    .await?;

    replace_pis(&mut *tx, project.id, &project.pi_ids).await?;
    tx.commit().await?;
    Ok(())
}

async fn replace_pis(conn: &mut SqliteConnection, project_id: Uuid, pi_ids: &[Uuid]) -> Result<()> {
    sqlx::query("DELETE FROM project_pis WHERE project_id = ?")
        .bind(project_id.to_string())
        .execute(&mut *conn)
        .await?;

    for pi in pi_ids {
        sqlx::query("INSERT OR IGNORE INTO project_pis (project_id, person_id) VALUES (?, ?)")
            .bind(project_id.to_string())
            .bind(pi.to_string())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn load_pis(pool: &SqlitePool, project_id: &str) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT person_id FROM project_pis WHERE project_id = ? ORDER BY person_id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    ids.iter().map(|id| parse_uuid("pi", id)).collect()
}

async fn project_from_row(pool: &SqlitePool, row: &SqliteRow) -> Result<Project> {
    let id: String = row.get("id");
    let award_numbers: String = row.get("award_numbers");
    let created_at: String = row.get("created_at");

    Ok(Project {
        id: parse_uuid("project", &id)?,
        name: row.get("name"),
        description: row.get("description"),
        start_date: time::date_from_db("start_date", row.get("start_date"))?,
        end_date: time::date_from_db("end_date", row.get("end_date"))?,
        pi_ids: load_pis(pool, &id).await?,
        funding_entity: row.get("funding_entity"),
        award_numbers: from_json("award_numbers", &award_numbers)?,
        storage_allocated: row.get("storage_allocated"),
        storage_used: row.get("storage_used"),
        created_at: time::from_db("created_at", &created_at)?,
    })
}

pub async fn load_project(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(project_from_row(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM projects ORDER BY created_at, name",
        PROJECT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in &rows {
        projects.push(project_from_row(pool, row).await?);
    }
    Ok(projects)
}

/// Projects where the person is a principal investigator
pub async fn list_projects_for_pi(pool: &SqlitePool, person_id: Uuid) -> Result<Vec<Project>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM projects WHERE id IN \
         (SELECT project_id FROM project_pis WHERE person_id = ?) ORDER BY created_at, name",
        PROJECT_COLUMNS
    ))
    .bind(person_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in &rows {
        projects.push(project_from_row(pool, row).await?);
    }
    Ok(projects)
}

/// Account newly deposited bytes against the project quota
///
/// Returns false, changing nothing, when the bytes do not fit. A quota of 0
/// is unlimited.
pub async fn reserve_storage(
    conn: &mut SqliteConnection,
    project_id: Uuid,
    bytes: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE projects SET storage_used = storage_used + ? \
         WHERE id = ? AND (storage_allocated = 0 OR storage_used + ? <= storage_allocated)",
    )
    .bind(bytes)
    .bind(project_id.to_string())
    .bind(bytes)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
