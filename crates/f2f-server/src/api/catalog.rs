//! Products, bundle composition, categories and producers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use f2f_core::{slugify, BundleItem, Category, Producer, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct StockUpdateRequest {
    /// `null` turns stock tracking off.
    pub stock: Option<Decimal>,
    #[serde(default)]
    pub backorder: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct BundleItemInput {
    pub product_id: i64,
    pub qty: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct BundleItemsRequest {
    pub items: Vec<BundleItemInput>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCategoryRequest {
    pub name: String,
    /// Derived from `name` when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryParentRequest {
    pub parent_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreatedId {
    pub id: i64,
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let rid = &req_id.0;
    let rows = f2f_db::list_products(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(Product::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = load_product(&state, &req_id.0, id).await?;
    Ok(ApiResponse::new(product, req_id.0))
}

pub(super) async fn update_stock(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<StockUpdateRequest>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let rid = &req_id.0;

    if body.stock.is_some_and(|s| s.is_sign_negative()) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "stock must not be negative",
        ));
    }

    f2f_db::update_product_stock(&state.pool, id, body.stock, body.backorder)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let product = load_product(&state, rid, id).await?;
    Ok(ApiResponse::new(product, req_id.0))
}

pub(super) async fn list_bundle_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<BundleItem>>>, ApiError> {
    let rows = f2f_db::list_bundle_items(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(BundleItem::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

/// PUT /api/v1/products/{id}/bundle-items: replaces the whole composition.
pub(super) async fn replace_bundle_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<BundleItemsRequest>,
) -> Result<Json<ApiResponse<Vec<BundleItem>>>, ApiError> {
    let rid = &req_id.0;

    let bundle = load_product(&state, rid, id).await?;
    if !bundle.is_bundle() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("product {id} is not a bundle"),
        ));
    }
    let items = validate_bundle_items(rid, id, &body.items)?;

    f2f_db::replace_bundle_items(&state.pool, id, &items)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = items
        .into_iter()
        .map(|(product_id, qty)| BundleItem {
            box_id: id,
            product_id,
            qty,
        })
        .collect();
    Ok(ApiResponse::new(data, req_id.0))
}

fn validate_bundle_items(
    req_id: &str,
    box_id: i64,
    items: &[BundleItemInput],
) -> Result<Vec<(i64, Decimal)>, ApiError> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .map(|item| {
            if item.product_id == box_id {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    "a bundle cannot contain itself",
                ));
            }
            if item.qty <= Decimal::ZERO {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    format!("qty for product {} must be positive", item.product_id),
                ));
            }
            if !seen.insert(item.product_id) {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    format!("product {} is listed twice", item.product_id),
                ));
            }
            Ok((item.product_id, item.qty))
        })
        .collect()
}

async fn load_product(state: &AppState, req_id: &str, id: i64) -> Result<Product, ApiError> {
    let row = f2f_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?;
    Product::try_from(row).map_err(|e| map_db_error(req_id.to_owned(), &e))
}

// ---------------------------------------------------------------------------
// Categories and producers
// ---------------------------------------------------------------------------

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    let rows = f2f_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Category::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedId>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    let slug = body
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| slugify(&name), str::to_owned);
    if name.is_empty() || slug.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must produce a non-empty slug",
        ));
    }

    let write = f2f_db::CategoryWrite {
        name,
        slug,
        description: body.description,
        cover_url: body.cover_url,
        sort_order: body.sort_order,
        enabled: body.enabled,
        woo_id: None,
    };
    let id = f2f_db::insert_category(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if body.parent_id.is_some() {
        f2f_db::set_category_parent(&state.pool, id, body.parent_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    }

    Ok((StatusCode::CREATED, ApiResponse::new(CreatedId { id }, req_id.0)))
}

/// PUT /api/v1/categories/{id}/parent: `null` detaches the category.
pub(super) async fn set_category_parent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryParentRequest>,
) -> Result<StatusCode, ApiError> {
    f2f_db::set_category_parent(&state.pool, id, body.parent_id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_producers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Producer>>>, ApiError> {
    let rows = f2f_db::list_producers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Producer::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(product_id: i64, qty: Decimal) -> BundleItemInput {
        BundleItemInput { product_id, qty }
    }

    #[test]
    fn bundle_items_accept_distinct_positive_components() {
        let items = validate_bundle_items("r", 10, &[input(1, dec!(2)), input(2, dec!(0.5))])
            .expect("valid");
        assert_eq!(items, vec![(1, dec!(2)), (2, dec!(0.5))]);
    }

    #[test]
    fn bundle_items_reject_self_reference() {
        let err = validate_bundle_items("r", 10, &[input(10, dec!(1))]).expect_err("invalid");
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn bundle_items_reject_non_positive_qty() {
        assert!(validate_bundle_items("r", 10, &[input(1, Decimal::ZERO)]).is_err());
    }

    #[test]
    fn bundle_items_reject_duplicates() {
        assert!(validate_bundle_items("r", 10, &[input(1, dec!(1)), input(1, dec!(2))]).is_err());
    }

    #[test]
    fn create_category_defaults_to_enabled() {
        let body: CreateCategoryRequest =
            serde_json::from_value(serde_json::json!({ "name": "Gyümölcs" }))
                .expect("deserialize");
        assert!(body.enabled);
        assert_eq!(body.sort_order, 0);
        assert!(body.parent_id.is_none());
        assert!(body.slug.is_none());
    }
}
