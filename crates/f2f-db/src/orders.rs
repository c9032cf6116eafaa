//! Database operations for `orders`.
//!
//! Status, payment and item changes load the row with `FOR UPDATE`, apply the
//! change through the core [`Order`] methods (which append the history entry)
//! and write it back in the same transaction, so concurrent edits cannot drop
//! each other's history entries.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use f2f_core::{
    check_availability, Actor, Address, ItemsUpdate, NewOrder, Order, OrderHistory, OrderItem,
    OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, Product, ShippingMethod,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::{get_products_by_ids, DbError};

pub(crate) const ORDER_COLUMNS: &str = "id, date_created, updated_at, customer_id, customer_name, \
     billing_emails, notify_emails, note, shipping_address, billing_address, deny_invoice, \
     need_vat, surcharge_amount, items, subtotal, shipping_cost, vat_total, discount_total, \
     total, payed_amount, shipping_method, payment_method, order_status, payment_status, \
     payment_due_days, courier, planned_shipping_date, shipment_time, history, shipment_id, \
     history_for_user, woo_customer_id";

/// A row from the `orders` table. JSONB columns decode straight into core types.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    pub date_created: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub billing_emails: Vec<String>,
    pub notify_emails: Vec<String>,
    pub note: String,
    pub shipping_address: Option<Json<Address>>,
    pub billing_address: Option<Json<Address>>,
    pub deny_invoice: bool,
    pub need_vat: bool,
    pub surcharge_amount: Decimal,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub vat_total: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub payed_amount: Decimal,
    pub shipping_method: Option<Json<ShippingMethod>>,
    pub payment_method: Option<Json<PaymentMethod>>,
    pub order_status: String,
    pub payment_status: String,
    pub payment_due_days: i32,
    pub courier: Option<String>,
    pub planned_shipping_date: Option<NaiveDate>,
    pub shipment_time: Option<String>,
    pub history: Json<OrderHistory>,
    pub shipment_id: Option<i64>,
    pub history_for_user: String,
    pub woo_customer_id: Option<i64>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            date_created: row.date_created,
            updated_at: row.updated_at,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            billing_emails: row.billing_emails,
            notify_emails: row.notify_emails,
            note: row.note,
            shipping_address: row.shipping_address.map(|j| j.0),
            billing_address: row.billing_address.map(|j| j.0),
            deny_invoice: row.deny_invoice,
            need_vat: row.need_vat,
            items: row.items.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                shipping_cost: row.shipping_cost,
                vat_total: row.vat_total,
                discount_total: row.discount_total,
                surcharge_amount: row.surcharge_amount,
                total: row.total,
            },
            payed_amount: row.payed_amount,
            shipping_method: row.shipping_method.map(|j| j.0),
            payment_method: row.payment_method.map(|j| j.0),
            order_status: row.order_status.parse::<OrderStatus>()?,
            payment_status: row.payment_status.parse::<PaymentStatus>()?,
            payment_due_days: row.payment_due_days,
            courier: row.courier,
            planned_shipping_date: row.planned_shipping_date,
            shipment_time: row.shipment_time,
            history: row.history.0,
            shipment_id: row.shipment_id,
            history_for_user: row.history_for_user,
            woo_customer_id: row.woo_customer_id,
        })
    }
}

/// Filters for [`list_orders`]. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub shipment_id: Option<i64>,
    pub planned_shipping_date: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

/// Creates an order with derived totals, a fresh order number from
/// `order_number_seq` and a single `pending` history entry.
///
/// # Errors
///
/// Returns [`DbError::Domain`] if a catalog line exceeds the product's
/// available stock, or [`DbError::Sqlx`] if the insert fails.
pub async fn create_order(pool: &PgPool, order: &NewOrder) -> Result<Order, DbError> {
    ensure_available(pool, &order.items).await?;
    let totals = order.totals();
    let history = OrderHistory::created(Utc::now());

    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders \
             (customer_id, customer_name, billing_emails, notify_emails, note, \
              shipping_address, billing_address, deny_invoice, need_vat, surcharge_amount, \
              items, subtotal, shipping_cost, vat_total, discount_total, total, payed_amount, \
              shipping_method, payment_method, order_status, payment_status, payment_due_days, \
              courier, planned_shipping_date, shipment_time, history, woo_customer_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, 'pending', 'pending', $20, $21, $22, $23, $24, $25) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.billing_emails)
    .bind(&order.notify_emails)
    .bind(&order.note)
    .bind(order.shipping_address.as_ref().map(Json))
    .bind(order.billing_address.as_ref().map(Json))
    .bind(order.deny_invoice)
    .bind(order.need_vat)
    .bind(totals.surcharge_amount)
    .bind(Json(&order.items))
    .bind(totals.subtotal)
    .bind(totals.shipping_cost)
    .bind(totals.vat_total)
    .bind(totals.discount_total)
    .bind(totals.total)
    .bind(order.payed_amount)
    .bind(order.shipping_method.as_ref().map(Json))
    .bind(order.payment_method.as_ref().map(Json))
    .bind(order.payment_due_days)
    .bind(&order.courier)
    .bind(order.planned_shipping_date)
    .bind(&order.shipment_time)
    .bind(Json(&history))
    .bind(order.woo_customer_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(order_id = %row.id, total = %totals.total, "order created");
    Order::try_from(row)
}

/// Inserts an order that already carries its id (WooCommerce import).
///
/// Returns `false` when an order with this id already exists. Numeric ids
/// move `order_number_seq` past them so later orders cannot collide.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_imported_order(pool: &PgPool, order: &Order) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO orders \
             (id, date_created, updated_at, customer_id, customer_name, billing_emails, \
              notify_emails, note, shipping_address, billing_address, deny_invoice, need_vat, \
              surcharge_amount, items, subtotal, shipping_cost, vat_total, discount_total, total, \
              payed_amount, shipping_method, payment_method, order_status, payment_status, \
              payment_due_days, courier, planned_shipping_date, shipment_time, history, \
              history_for_user, woo_customer_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&order.id)
    .bind(order.date_created)
    .bind(order.updated_at)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.billing_emails)
    .bind(&order.notify_emails)
    .bind(&order.note)
    .bind(order.shipping_address.as_ref().map(Json))
    .bind(order.billing_address.as_ref().map(Json))
    .bind(order.deny_invoice)
    .bind(order.need_vat)
    .bind(order.totals.surcharge_amount)
    .bind(Json(&order.items))
    .bind(order.totals.subtotal)
    .bind(order.totals.shipping_cost)
    .bind(order.totals.vat_total)
    .bind(order.totals.discount_total)
    .bind(order.totals.total)
    .bind(order.payed_amount)
    .bind(order.shipping_method.as_ref().map(Json))
    .bind(order.payment_method.as_ref().map(Json))
    .bind(order.order_status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.payment_due_days)
    .bind(&order.courier)
    .bind(order.planned_shipping_date)
    .bind(&order.shipment_time)
    .bind(Json(&order.history))
    .bind(&order.history_for_user)
    .bind(order.woo_customer_id)
    .execute(&mut *tx)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        if let Ok(number) = order.id.parse::<i64>() {
            sqlx::query(
                "SELECT setval('order_number_seq', \
                     GREATEST((SELECT last_value FROM order_number_seq), $1))",
            )
            .bind(number)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Returns `true` if an order with this id exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn order_exists(pool: &PgPool, id: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Fetches one order by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist,
/// [`DbError::Domain`] if a stored status is unknown, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_order(pool: &PgPool, id: &str) -> Result<Order, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Order::try_from(row)
}

/// Lists orders newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Domain`] if a
/// stored status is unknown.
pub async fn list_orders(pool: &PgPool, filter: &OrderListFilter) -> Result<Vec<Order>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE ($1::TEXT IS NULL OR order_status = $1) \
           AND ($2::TEXT IS NULL OR payment_status = $2) \
           AND ($3::BIGINT IS NULL OR shipment_id = $3) \
           AND ($4::DATE IS NULL OR planned_shipping_date = $4) \
         ORDER BY date_created DESC, id DESC \
         LIMIT $5 OFFSET $6"
    ))
    .bind(filter.order_status.map(OrderStatus::as_str))
    .bind(filter.payment_status.map(PaymentStatus::as_str))
    .bind(filter.shipment_id)
    .bind(filter.planned_shipping_date)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Order::try_from).collect()
}

/// Returns every order attached to a shipment, whatever its status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Domain`] if a
/// stored status is unknown.
pub async fn list_orders_for_shipment(pool: &PgPool, shipment_id: i64) -> Result<Vec<Order>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_shipment_orders(&mut conn, shipment_id).await
}

pub(crate) async fn fetch_shipment_orders(
    conn: &mut PgConnection,
    shipment_id: i64,
) -> Result<Vec<Order>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE shipment_id = $1 ORDER BY id"
    ))
    .bind(shipment_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Order::try_from).collect()
}

async fn lock_order(conn: &mut PgConnection, id: &str) -> Result<Order, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?;

    Order::try_from(row)
}

/// Sets the order status and appends one history entry.
///
/// If the order belongs to a shipment, that shipment's counters are refreshed
/// in the same transaction (a cancellation removes the order from them).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn update_order_status(
    pool: &PgPool,
    id: &str,
    status: OrderStatus,
    note: Option<String>,
    actor: &Actor,
) -> Result<Order, DbError> {
    let mut tx = pool.begin().await?;
    let mut order = lock_order(&mut tx, id).await?;
    let previous = order.order_status;
    order.set_status(status, note, actor, Utc::now());

    sqlx::query("UPDATE orders SET order_status = $1, history = $2, updated_at = $3 WHERE id = $4")
        .bind(order.order_status.as_str())
        .bind(Json(&order.history))
        .bind(order.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if let Some(shipment_id) = order.shipment_id {
        crate::shipments::refresh_counters_locked(&mut tx, shipment_id).await?;
    }
    tx.commit().await?;

    tracing::info!(order_id = id, from = %previous, to = %status, "order status updated");
    Ok(order)
}

/// Sets the payment status and appends one history entry.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn update_payment_status(
    pool: &PgPool,
    id: &str,
    status: PaymentStatus,
    note: Option<String>,
    actor: &Actor,
) -> Result<Order, DbError> {
    let mut tx = pool.begin().await?;
    let mut order = lock_order(&mut tx, id).await?;
    order.set_payment_status(status, note, actor, Utc::now());

    sqlx::query(
        "UPDATE orders SET payment_status = $1, history = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(order.payment_status.as_str())
    .bind(Json(&order.history))
    .bind(order.updated_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(order_id = id, payment_status = %status, "payment status updated");
    Ok(order)
}

/// Replaces the line items, recomputes `subtotal` and `total`, and appends
/// one history entry. The shipment counters follow in the same transaction.
///
/// # Errors
///
/// Returns [`DbError::Domain`] if a catalog line exceeds the product's
/// available stock, [`DbError::NotFound`] if the order does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn update_order_items(
    pool: &PgPool,
    id: &str,
    update: ItemsUpdate,
    actor: &Actor,
) -> Result<Order, DbError> {
    ensure_available(pool, &update.items).await?;

    let mut tx = pool.begin().await?;
    let mut order = lock_order(&mut tx, id).await?;
    order.replace_items(update, actor, Utc::now());

    sqlx::query(
        "UPDATE orders SET \
             items = $1, subtotal = $2, shipping_cost = $3, surcharge_amount = $4, \
             discount_total = $5, total = $6, history = $7, history_for_user = $8, \
             updated_at = $9 \
         WHERE id = $10",
    )
    .bind(Json(&order.items))
    .bind(order.totals.subtotal)
    .bind(order.totals.shipping_cost)
    .bind(order.totals.surcharge_amount)
    .bind(order.totals.discount_total)
    .bind(order.totals.total)
    .bind(Json(&order.history))
    .bind(&order.history_for_user)
    .bind(order.updated_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if let Some(shipment_id) = order.shipment_id {
        crate::shipments::refresh_counters_locked(&mut tx, shipment_id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        order_id = id,
        items = order.items.len(),
        total = %order.totals.total,
        "order items updated"
    );
    Ok(order)
}

/// Rejects line items whose catalog product cannot supply the requested
/// quantity. Lines without a stored product are not checked.
async fn ensure_available(pool: &PgPool, items: &[OrderItem]) -> Result<(), DbError> {
    let mut ids: Vec<i64> = items.iter().filter_map(OrderItem::catalog_product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let products = get_products_by_ids(pool, &ids)
        .await?
        .into_iter()
        .map(|row| Product::try_from(row).map(|p| (p.id, p)))
        .collect::<Result<HashMap<_, _>, _>>()?;

    check_availability(items, &products)?;
    Ok(())
}
