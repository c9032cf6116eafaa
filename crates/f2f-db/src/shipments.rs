//! Database operations for `shipments` and order-to-shipment assignment.
//!
//! Every operation that changes shipment membership runs in one transaction
//! that locks the affected order row first and then the affected shipment
//! rows in ascending id order. Counters are recomputed from the member orders
//! while those locks are held, so two concurrent attachments to the same
//! shipment serialize and neither update is lost.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use f2f_core::{
    shipment_counters, summarize_shipment_items, OrderItem, Product, Shipment, ShipmentSummary,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::bundles::bundle_items_for;
use crate::orders::fetch_shipment_orders;
use crate::products::get_products_by_ids;
use crate::DbError;

const SHIPMENT_COLUMNS: &str =
    "id, date, product_count, product_amount, order_count, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipmentRow {
    pub id: i64,
    pub date: NaiveDate,
    pub product_count: i64,
    pub product_amount: Decimal,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShipmentRow> for Shipment {
    fn from(row: ShipmentRow) -> Self {
        Shipment {
            id: row.id,
            date: row.date,
            product_count: row.product_count,
            product_amount: row.product_amount,
            order_count: row.order_count,
            updated_at: row.updated_at,
        }
    }
}

/// Fetches one shipment by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shipment does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_shipment(pool: &PgPool, id: i64) -> Result<ShipmentRow, DbError> {
    sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches the shipment for a delivery date, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shipment_by_date(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Option<ShipmentRow>, DbError> {
    let row = sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE date = $1"
    ))
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` shipments, latest delivery date first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shipments(pool: &PgPool, limit: i64) -> Result<Vec<ShipmentRow>, DbError> {
    let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments ORDER BY date DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every shipment dated on or after `from`, earliest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_upcoming_shipments(
    pool: &PgPool,
    from: NaiveDate,
) -> Result<Vec<ShipmentRow>, DbError> {
    let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE date >= $1 ORDER BY date"
    ))
    .bind(from)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Attaches an order to the shipment of its planned shipping date, creating
/// the shipment when none exists for that date, and recomputes the counters
/// of the target shipment (and of the previous one, if the order moved).
///
/// Returns the target shipment with fresh counters. An order that is already
/// in the right shipment is left in place; its counters are still refreshed.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist,
/// [`DbError::NoPlannedDate`] if it has no planned shipping date, or
/// [`DbError::Sqlx`] if any statement fails. Nothing is changed on error.
pub async fn ensure_order_in_shipment(pool: &PgPool, order_id: &str) -> Result<ShipmentRow, DbError> {
    let mut tx = pool.begin().await?;

    let (planned, current) = lock_order_membership(&mut tx, order_id).await?;
    let date = planned.ok_or_else(|| DbError::NoPlannedDate(order_id.to_string()))?;

    sqlx::query("INSERT INTO shipments (date) VALUES ($1) ON CONFLICT (date) DO NOTHING")
        .bind(date)
        .execute(&mut *tx)
        .await?;
    let target = sqlx::query_scalar::<_, i64>("SELECT id FROM shipments WHERE date = $1")
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

    let previous = current.filter(|id| *id != target);
    lock_shipments(&mut tx, target, previous).await?;

    if current != Some(target) {
        set_order_shipment(&mut tx, order_id, Some(target)).await?;
    }
    if let Some(previous) = previous {
        recompute_counters(&mut tx, previous).await?;
    }
    let shipment = recompute_counters(&mut tx, target).await?;
    tx.commit().await?;

    tracing::info!(
        order_id,
        shipment_id = shipment.id,
        date = %shipment.date,
        order_count = shipment.order_count,
        moved_from = ?previous,
        "order attached to shipment"
    );
    Ok(shipment)
}

/// Moves an order into a specific shipment and copies the shipment's date
/// into the order's planned shipping date.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order or shipment does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn assign_order_to_shipment(
    pool: &PgPool,
    order_id: &str,
    shipment_id: i64,
) -> Result<ShipmentRow, DbError> {
    let mut tx = pool.begin().await?;

    let (_, current) = lock_order_membership(&mut tx, order_id).await?;
    let previous = current.filter(|id| *id != shipment_id);
    lock_shipments(&mut tx, shipment_id, previous).await?;

    let date = sqlx::query_scalar::<_, NaiveDate>("SELECT date FROM shipments WHERE id = $1")
        .bind(shipment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    sqlx::query(
        "UPDATE orders SET shipment_id = $1, planned_shipping_date = $2, updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(shipment_id)
    .bind(date)
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    if let Some(previous) = previous {
        recompute_counters(&mut tx, previous).await?;
    }
    let shipment = recompute_counters(&mut tx, shipment_id).await?;
    tx.commit().await?;

    tracing::info!(order_id, shipment_id, date = %date, "order assigned to shipment");
    Ok(shipment)
}

/// Detaches an order from its shipment and recomputes that shipment's counters.
///
/// Returns the shipment the order left, or `None` if it was not in one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn remove_order_from_shipment(
    pool: &PgPool,
    order_id: &str,
) -> Result<Option<ShipmentRow>, DbError> {
    let mut tx = pool.begin().await?;

    let (_, current) = lock_order_membership(&mut tx, order_id).await?;
    let Some(shipment_id) = current else {
        tx.commit().await?;
        return Ok(None);
    };

    lock_shipments(&mut tx, shipment_id, None).await?;
    set_order_shipment(&mut tx, order_id, None).await?;
    let shipment = recompute_counters(&mut tx, shipment_id).await?;
    tx.commit().await?;

    tracing::info!(order_id, shipment_id, "order removed from shipment");
    Ok(Some(shipment))
}

/// Recomputes the stored counters of one shipment from its member orders.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shipment does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn refresh_shipment_counts(pool: &PgPool, shipment_id: i64) -> Result<ShipmentRow, DbError> {
    let mut tx = pool.begin().await?;
    lock_shipments(&mut tx, shipment_id, None).await?;
    let shipment = recompute_counters(&mut tx, shipment_id).await?;
    tx.commit().await?;

    tracing::debug!(
        shipment_id,
        order_count = shipment.order_count,
        product_count = shipment.product_count,
        product_amount = %shipment.product_amount,
        "shipment counters refreshed"
    );
    Ok(shipment)
}

/// Locks one shipment and recomputes its counters inside the caller's
/// transaction. The caller must already hold the member order's row lock.
pub(crate) async fn refresh_counters_locked(
    conn: &mut PgConnection,
    shipment_id: i64,
) -> Result<ShipmentRow, DbError> {
    lock_shipments(conn, shipment_id, None).await?;
    recompute_counters(conn, shipment_id).await
}

/// Result of a bulk counter refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub refreshed: usize,
    pub failed: usize,
}

/// Recomputes the counters of every shipment dated on or after `from`.
///
/// A shipment that fails to refresh is logged and counted; the others still run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] only if the shipments cannot be listed.
pub async fn refresh_upcoming_shipments(
    pool: &PgPool,
    from: NaiveDate,
) -> Result<RefreshOutcome, DbError> {
    let shipments = list_upcoming_shipments(pool, from).await?;
    let mut outcome = RefreshOutcome::default();

    for shipment in shipments {
        match refresh_shipment_counts(pool, shipment.id).await {
            Ok(_) => outcome.refreshed += 1,
            Err(e) => {
                tracing::warn!(shipment_id = shipment.id, date = %shipment.date, error = %e, "shipment refresh failed");
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Builds the pick list of one shipment from its member orders, the products
/// they reference and the composition of any bundles among them.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shipment does not exist,
/// [`DbError::Domain`] if a stored product type is unknown, or
/// [`DbError::Sqlx`] if any query fails.
pub async fn shipment_summary(pool: &PgPool, shipment_id: i64) -> Result<ShipmentSummary, DbError> {
    get_shipment(pool, shipment_id).await?;

    let mut conn = pool.acquire().await?;
    let orders = fetch_shipment_orders(&mut conn, shipment_id).await?;
    drop(conn);

    let mut product_ids: Vec<i64> = orders
        .iter()
        .flat_map(|o| o.items.iter())
        .filter_map(OrderItem::catalog_product_id)
        .collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let products = get_products_by_ids(pool, &product_ids)
        .await?
        .into_iter()
        .map(|row| Product::try_from(row).map(|p| (p.id, p)))
        .collect::<Result<HashMap<i64, Product>, DbError>>()?;

    let bundle_ids: Vec<i64> = products
        .values()
        .filter(|p| p.is_bundle())
        .map(|p| p.id)
        .collect();
    let bundles = bundle_items_for(pool, &bundle_ids).await?;

    Ok(summarize_shipment_items(&orders, &products, &bundles))
}

async fn lock_order_membership(
    conn: &mut PgConnection,
    order_id: &str,
) -> Result<(Option<NaiveDate>, Option<i64>), DbError> {
    sqlx::query_as::<_, (Option<NaiveDate>, Option<i64>)>(
        "SELECT planned_shipping_date, shipment_id FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)
}

/// Locks one or two shipment rows in ascending id order.
async fn lock_shipments(
    conn: &mut PgConnection,
    target: i64,
    other: Option<i64>,
) -> Result<(), DbError> {
    let mut ids = vec![target];
    ids.extend(other);
    ids.sort_unstable();

    let locked = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM shipments WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    if !locked.contains(&target) {
        return Err(DbError::NotFound);
    }
    Ok(())
}

async fn set_order_shipment(
    conn: &mut PgConnection,
    order_id: &str,
    shipment_id: Option<i64>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE orders SET shipment_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(shipment_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn recompute_counters(
    conn: &mut PgConnection,
    shipment_id: i64,
) -> Result<ShipmentRow, DbError> {
    let orders = fetch_shipment_orders(conn, shipment_id).await?;
    let counters = shipment_counters(&orders);

    let row = sqlx::query_as::<_, ShipmentRow>(&format!(
        "UPDATE shipments SET \
             order_count = $1, product_count = $2, product_amount = $3, updated_at = NOW() \
         WHERE id = $4 \
         RETURNING {SHIPMENT_COLUMNS}"
    ))
    .bind(counters.order_count)
    .bind(counters.product_count)
    .bind(counters.product_amount)
    .bind(shipment_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}
