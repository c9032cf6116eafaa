//! Database operations for `import_runs` and `import_run_entities`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `import_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub dry_run: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one entity pass (`categories`, `producers`, `products`, `orders`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportRunEntityRow {
    pub id: i64,
    pub import_run_id: i64,
    pub entity: String,
    pub success: i32,
    pub errors: i32,
    pub details: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new import run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_import_run(
    pool: &PgPool,
    trigger_source: &str,
    dry_run: bool,
) -> Result<ImportRunRow, DbError> {
    let row = sqlx::query_as::<_, ImportRunRow>(
        "INSERT INTO import_runs (public_id, trigger_source, status, dry_run) \
         VALUES ($1, $2, 'queued', $3) \
         RETURNING id, public_id, trigger_source, status, dry_run, \
                   started_at, completed_at, error_message, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .bind(dry_run)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not queued,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_import_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a run as `succeeded`.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_import_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs SET status = 'succeeded', completed_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_import_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Fetches one run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run exists, or [`DbError::Sqlx`] if the query fails.
pub async fn get_import_run(pool: &PgPool, id: i64) -> Result<ImportRunRow, DbError> {
    sqlx::query_as::<_, ImportRunRow>(
        "SELECT id, public_id, trigger_source, status, dry_run, \
                started_at, completed_at, error_message, created_at \
         FROM import_runs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_runs(pool: &PgPool, limit: i64) -> Result<Vec<ImportRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ImportRunRow>(
        "SELECT id, public_id, trigger_source, status, dry_run, \
                started_at, completed_at, error_message, created_at \
         FROM import_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records (or overwrites) the outcome of one entity pass of a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_import_entity(
    pool: &PgPool,
    run_id: i64,
    entity: &str,
    success: i32,
    errors: i32,
    details: &[String],
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO import_run_entities (import_run_id, entity, success, errors, details) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (import_run_id, entity) DO UPDATE SET \
             success = EXCLUDED.success, \
             errors  = EXCLUDED.errors, \
             details = EXCLUDED.details",
    )
    .bind(run_id)
    .bind(entity)
    .bind(success)
    .bind(errors)
    .bind(Json(details))
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the entity rows of a run in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_run_entities(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<ImportRunEntityRow>, DbError> {
    let rows = sqlx::query_as::<_, ImportRunEntityRow>(
        "SELECT id, import_run_id, entity, success, errors, details, created_at \
         FROM import_run_entities \
         WHERE import_run_id = $1 \
         ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
