use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use f2f_core::{
    Actor, EmailTemplate, EmailTrigger, ItemsUpdate, NewOrder, Order, OrderStatus, PaymentStatus,
    Shipment,
};
use f2f_notify::{Notifier, Recipient, SendOutcome};
use serde::Deserialize;
use sqlx::PgPool;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct OrdersQuery {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub shipment_id: Option<i64>,
    pub planned_shipping_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusChange<S> {
    pub status: S,
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(super) struct ItemsChange {
    #[serde(flatten)]
    pub update: ItemsUpdate,
    #[serde(default)]
    pub actor: Actor,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AttachShipmentRequest {
    /// Explicit target; without it the order joins the shipment of its planned date.
    pub shipment_id: Option<i64>,
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let filter = f2f_db::OrderListFilter {
        order_status: query.order_status,
        payment_status: query.payment_status,
        shipment_id: query.shipment_id,
        planned_shipping_date: query.planned_shipping_date,
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let orders = f2f_db::list_orders(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(orders, req_id.0))
}

pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = f2f_db::get_order(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(order, req_id.0))
}

/// POST /api/v1/orders
///
/// A dated order is batched into its shipment right away. Once the order is
/// stored the request succeeds: a batching failure is logged and left to the
/// shipment endpoints, and the order-placed email is sent in the background.
pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ApiError> {
    let rid = &req_id.0;

    if body.customer_name.trim().is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "customer_name must not be empty",
        ));
    }

    let mut order = f2f_db::create_order(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if order.planned_shipping_date.is_some() {
        match f2f_db::ensure_order_in_shipment(&state.pool, &order.id).await {
            Ok(shipment) => order.shipment_id = Some(shipment.id),
            Err(e) => tracing::warn!(
                request_id = %rid,
                order_id = %order.id,
                error = %e,
                "order stored but could not be added to its shipment"
            ),
        }
    }

    if let Some(notifier) = state.notifier.clone() {
        tokio::spawn(notify_order_placed(
            state.pool.clone(),
            notifier,
            order.clone(),
        ));
    }

    Ok((StatusCode::CREATED, ApiResponse::new(order, req_id.0)))
}

async fn notify_order_placed(pool: PgPool, notifier: Arc<Notifier>, order: Order) {
    let Some(email) = order
        .notify_emails
        .first()
        .or_else(|| order.billing_emails.first())
    else {
        tracing::info!(order_id = %order.id, "order has no email address; skipping notification");
        return;
    };

    let template = match f2f_db::get_email_template(&pool, EmailTrigger::OrderPlaced).await {
        Ok(row) => row.map(EmailTemplate::try_from).transpose(),
        Err(e) => Err(e),
    };
    let template = match template {
        Ok(template) => template,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "failed to load order-placed template");
            return;
        }
    };

    let recipient = Recipient::new(email.clone(), Some(order.customer_name.clone()));
    match notifier
        .send_order_placed(
            template.as_ref(),
            &recipient,
            &order.id,
            order.planned_shipping_date,
        )
        .await
    {
        Ok(SendOutcome::Sent { id }) => {
            tracing::info!(order_id = %order.id, message_id = %id, "order-placed email sent");
        }
        Ok(SendOutcome::Skipped) => {}
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "order-placed email failed");
        }
    }
}

pub(super) async fn update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<StatusChange<OrderStatus>>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = f2f_db::update_order_status(&state.pool, &id, body.status, body.note, &body.actor)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(order, req_id.0))
}

pub(super) async fn update_payment_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<StatusChange<PaymentStatus>>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order =
        f2f_db::update_payment_status(&state.pool, &id, body.status, body.note, &body.actor)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(order, req_id.0))
}

pub(super) async fn update_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<ItemsChange>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = f2f_db::update_order_items(&state.pool, &id, body.update, &body.actor)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(order, req_id.0))
}

pub(super) async fn attach_shipment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Option<Json<AttachShipmentRequest>>,
) -> Result<Json<ApiResponse<Shipment>>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let shipment = match body.shipment_id {
        Some(shipment_id) => f2f_db::assign_order_to_shipment(&state.pool, &id, shipment_id).await,
        None => f2f_db::ensure_order_in_shipment(&state.pool, &id).await,
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(Shipment::from(shipment), req_id.0))
}

pub(super) async fn detach_shipment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<Shipment>>>, ApiError> {
    let shipment = f2f_db::remove_order_from_shipment(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(shipment.map(Shipment::from), req_id.0))
}
