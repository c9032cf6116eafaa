use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use f2f_core::{Order, Shipment, ShipmentSummary};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ShipmentsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RefreshQuery {
    /// First date to reconcile; defaults to today (UTC).
    pub from: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshResult {
    from: NaiveDate,
    refreshed: usize,
    failed: usize,
}

pub(super) async fn list_shipments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ShipmentsQuery>,
) -> Result<Json<ApiResponse<Vec<Shipment>>>, ApiError> {
    let rows = f2f_db::list_shipments(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Shipment::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn get_shipment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Shipment>>, ApiError> {
    let row = f2f_db::get_shipment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(Shipment::from(row), req_id.0))
}

pub(super) async fn list_shipment_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let rid = &req_id.0;

    f2f_db::get_shipment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let orders = f2f_db::list_orders_for_shipment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(ApiResponse::new(orders, req_id.0))
}

/// GET /api/v1/shipments/{id}/summary: the pick list with bundles expanded.
pub(super) async fn get_shipment_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ShipmentSummary>>, ApiError> {
    let summary = f2f_db::shipment_summary(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(summary, req_id.0))
}

pub(super) async fn refresh_shipment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Shipment>>, ApiError> {
    let row = f2f_db::refresh_shipment_counts(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(Shipment::from(row), req_id.0))
}

pub(super) async fn refresh_upcoming(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<RefreshResult>>, ApiError> {
    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
    let outcome = f2f_db::refresh_upcoming_shipments(&state.pool, from)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        RefreshResult {
            from,
            refreshed: outcome.refreshed,
            failed: outcome.failed,
        },
        req_id.0,
    ))
}
