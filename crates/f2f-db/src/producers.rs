//! Database operations for `producers`.

use chrono::{DateTime, Utc};
use f2f_core::Producer;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProducerRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub bio: bool,
    pub enabled: bool,
    pub woo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProducerRow> for Producer {
    fn from(row: ProducerRow) -> Self {
        Producer {
            id: row.id,
            name: row.name,
            slug: row.slug,
            short_description: row.short_description,
            description: row.description,
            cover_url: row.cover_url,
            bio: row.bio,
            enabled: row.enabled,
            woo_id: row.woo_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProducerWrite {
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub bio: bool,
    pub enabled: bool,
    pub woo_id: Option<i64>,
}

/// Returns all producers ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_producers(pool: &PgPool) -> Result<Vec<ProducerRow>, DbError> {
    let rows = sqlx::query_as::<_, ProducerRow>(
        "SELECT id, name, slug, short_description, description, cover_url, bio, enabled, woo_id, \
                created_at, updated_at \
         FROM producers \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a producer and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_producer(pool: &PgPool, producer: &ProducerWrite) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO producers \
             (name, slug, short_description, description, cover_url, bio, enabled, woo_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(&producer.name)
    .bind(&producer.slug)
    .bind(&producer.short_description)
    .bind(&producer.description)
    .bind(&producer.cover_url)
    .bind(producer.bio)
    .bind(producer.enabled)
    .bind(producer.woo_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Overwrites the writable columns of producer `id`. `cover_url = None` keeps
/// the stored cover.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the producer does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_producer(
    pool: &PgPool,
    id: i64,
    producer: &ProducerWrite,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE producers SET \
             name = $1, slug = $2, short_description = $3, description = $4, \
             cover_url = COALESCE($5, cover_url), bio = $6, enabled = $7, \
             woo_id = COALESCE($8, woo_id), updated_at = NOW() \
         WHERE id = $9",
    )
    .bind(&producer.name)
    .bind(&producer.slug)
    .bind(&producer.short_description)
    .bind(&producer.description)
    .bind(&producer.cover_url)
    .bind(producer.bio)
    .bind(producer.enabled)
    .bind(producer.woo_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
