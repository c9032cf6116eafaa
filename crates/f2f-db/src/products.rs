//! Database operations for `products` and `product_categories`.

use chrono::{DateTime, Utc};
use f2f_core::{Product, ProductType};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, name, slug, sku, unit, size, bio, \
     net_price, net_price_vip, net_price_company, gross_price, vat_percent, \
     stock, backorder, product_type, producer_id, featured_image, enabled, woo_id, \
     created_at, updated_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub size: Option<String>,
    pub bio: bool,
    pub net_price: Decimal,
    pub net_price_vip: Decimal,
    pub net_price_company: Decimal,
    pub gross_price: Decimal,
    pub vat_percent: Decimal,
    /// `NULL` means stock is not tracked.
    pub stock: Option<Decimal>,
    pub backorder: bool,
    /// `'simple'` or `'bundle'`, enforced by a CHECK constraint.
    pub product_type: String,
    pub producer_id: Option<i64>,
    pub featured_image: Option<String>,
    pub enabled: bool,
    pub woo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            slug: row.slug,
            sku: row.sku,
            unit: row.unit,
            size: row.size,
            bio: row.bio,
            net_price: row.net_price,
            net_price_vip: row.net_price_vip,
            net_price_company: row.net_price_company,
            gross_price: row.gross_price,
            vat_percent: row.vat_percent,
            stock: row.stock,
            backorder: row.backorder,
            product_type: row.product_type.parse::<ProductType>()?,
            producer_id: row.producer_id,
            featured_image: row.featured_image,
            enabled: row.enabled,
            woo_id: row.woo_id,
            updated_at: Some(row.updated_at),
        })
    }
}

/// Writable product fields used by both insert and update.
#[derive(Debug, Clone)]
pub struct ProductWrite {
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub size: Option<String>,
    pub bio: bool,
    pub net_price: Decimal,
    pub net_price_vip: Decimal,
    pub net_price_company: Decimal,
    pub gross_price: Decimal,
    pub vat_percent: Decimal,
    pub stock: Option<Decimal>,
    pub backorder: bool,
    pub product_type: ProductType,
    pub producer_id: Option<i64>,
    pub featured_image: Option<String>,
    pub enabled: bool,
    pub woo_id: Option<i64>,
}

/// Returns all products ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches the products whose ids appear in `ids`. Unknown ids are ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_products_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<ProductRow>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a product and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (for example on a duplicate slug).
pub async fn insert_product(pool: &PgPool, product: &ProductWrite) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (name, slug, sku, unit, size, bio, net_price, net_price_vip, net_price_company, \
              gross_price, vat_percent, stock, backorder, product_type, producer_id, \
              featured_image, enabled, woo_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
         RETURNING id",
    )
    .bind(&product.name)
    .bind(&product.slug)
    .bind(&product.sku)
    .bind(&product.unit)
    .bind(&product.size)
    .bind(product.bio)
    .bind(product.net_price)
    .bind(product.net_price_vip)
    .bind(product.net_price_company)
    .bind(product.gross_price)
    .bind(product.vat_percent)
    .bind(product.stock)
    .bind(product.backorder)
    .bind(product.product_type.as_str())
    .bind(product.producer_id)
    .bind(&product.featured_image)
    .bind(product.enabled)
    .bind(product.woo_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Overwrites every writable column of product `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product(pool: &PgPool, id: i64, product: &ProductWrite) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET \
             name = $1, slug = $2, sku = $3, unit = $4, size = $5, bio = $6, \
             net_price = $7, net_price_vip = $8, net_price_company = $9, gross_price = $10, \
             vat_percent = $11, stock = $12, backorder = $13, product_type = $14, \
             producer_id = $15, featured_image = $16, enabled = $17, woo_id = $18, \
             updated_at = NOW() \
         WHERE id = $19",
    )
    .bind(&product.name)
    .bind(&product.slug)
    .bind(&product.sku)
    .bind(&product.unit)
    .bind(&product.size)
    .bind(product.bio)
    .bind(product.net_price)
    .bind(product.net_price_vip)
    .bind(product.net_price_company)
    .bind(product.gross_price)
    .bind(product.vat_percent)
    .bind(product.stock)
    .bind(product.backorder)
    .bind(product.product_type.as_str())
    .bind(product.producer_id)
    .bind(&product.featured_image)
    .bind(product.enabled)
    .bind(product.woo_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Sets stock tracking for a product. `None` switches tracking off (unlimited).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product_stock(
    pool: &PgPool,
    id: i64,
    stock: Option<Decimal>,
    backorder: bool,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET stock = $1, backorder = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(stock)
    .bind(backorder)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Replaces the category links of a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is rolled back.
pub async fn set_product_categories(
    pool: &PgPool,
    product_id: i64,
    category_ids: &[i64],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    if !category_ids.is_empty() {
        sqlx::query(
            "INSERT INTO product_categories (product_id, category_id) \
             SELECT $1, UNNEST($2::BIGINT[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
