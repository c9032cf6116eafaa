//! Database operations for `categories`.

use chrono::{DateTime, Utc};
use f2f_core::{validate_category_parent, Category};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub sort_order: i32,
    pub enabled: bool,
    pub parent_id: Option<i64>,
    pub woo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            cover_url: row.cover_url,
            order: row.sort_order,
            enabled: row.enabled,
            parent_id: row.parent_id,
            woo_id: row.woo_id,
        }
    }
}

/// Writable category fields. The parent link is changed only through
/// [`set_category_parent`] so the tree rules are always checked.
#[derive(Debug, Clone)]
pub struct CategoryWrite {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub sort_order: i32,
    pub enabled: bool,
    pub woo_id: Option<i64>,
}

/// Returns all categories ordered by display order, then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, slug, description, cover_url, sort_order, enabled, parent_id, woo_id, \
                created_at, updated_at \
         FROM categories \
         ORDER BY sort_order, name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a category without a parent and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_category(pool: &PgPool, category: &CategoryWrite) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name, slug, description, cover_url, sort_order, enabled, woo_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(&category.cover_url)
    .bind(category.sort_order)
    .bind(category.enabled)
    .bind(category.woo_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Overwrites the writable columns of category `id`. `cover_url = None` keeps
/// the stored cover.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    category: &CategoryWrite,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE categories SET \
             name = $1, slug = $2, description = $3, \
             cover_url = COALESCE($4, cover_url), sort_order = $5, enabled = $6, \
             woo_id = COALESCE($7, woo_id), updated_at = NOW() \
         WHERE id = $8",
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(&category.cover_url)
    .bind(category.sort_order)
    .bind(category.enabled)
    .bind(category.woo_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Sets or clears the parent of category `id`.
///
/// # Errors
///
/// Returns [`DbError::Domain`] if the root category would get a parent or a
/// category would become its own parent, [`DbError::NotFound`] if the
/// category does not exist, or [`DbError::Sqlx`] if the update fails.
pub async fn set_category_parent(
    pool: &PgPool,
    id: i64,
    parent_id: Option<i64>,
) -> Result<(), DbError> {
    validate_category_parent(id, parent_id)?;

    let result =
        sqlx::query("UPDATE categories SET parent_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(parent_id)
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
