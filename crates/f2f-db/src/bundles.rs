//! Database operations for `products_in_boxes` (bundle composition).

use std::collections::HashMap;

use f2f_core::BundleItem;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BundleItemRow {
    pub box_id: i64,
    pub product_id: i64,
    pub qty: Decimal,
}

impl From<BundleItemRow> for BundleItem {
    fn from(row: BundleItemRow) -> Self {
        BundleItem {
            box_id: row.box_id,
            product_id: row.product_id,
            qty: row.qty,
        }
    }
}

/// Returns the component rows of one bundle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_bundle_items(pool: &PgPool, box_id: i64) -> Result<Vec<BundleItemRow>, DbError> {
    let rows = sqlx::query_as::<_, BundleItemRow>(
        "SELECT box_id, product_id, qty FROM products_in_boxes \
         WHERE box_id = $1 ORDER BY product_id",
    )
    .bind(box_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the composition of every listed bundle, keyed by bundle id.
///
/// Bundles without components are absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn bundle_items_for(
    pool: &PgPool,
    box_ids: &[i64],
) -> Result<HashMap<i64, Vec<BundleItem>>, DbError> {
    if box_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, BundleItemRow>(
        "SELECT box_id, product_id, qty FROM products_in_boxes \
         WHERE box_id = ANY($1) ORDER BY box_id, product_id",
    )
    .bind(box_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i64, Vec<BundleItem>> = HashMap::new();
    for row in rows {
        map.entry(row.box_id).or_default().push(row.into());
    }
    Ok(map)
}

/// Replaces the composition of a bundle: all existing rows are deleted, then
/// `items` (`(product_id, qty)` pairs) are inserted, in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is changed in that case.
pub async fn replace_bundle_items(
    pool: &PgPool,
    box_id: i64,
    items: &[(i64, Decimal)],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM products_in_boxes WHERE box_id = $1")
        .bind(box_id)
        .execute(&mut *tx)
        .await?;

    for (product_id, qty) in items {
        sqlx::query("INSERT INTO products_in_boxes (box_id, product_id, qty) VALUES ($1, $2, $3)")
            .bind(box_id)
            .bind(product_id)
            .bind(qty)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::debug!(box_id, components = items.len(), "bundle composition replaced");
    Ok(())
}
