mod catalog;
mod email_templates;
mod import_runs;
mod orders;
mod shipments;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use f2f_notify::Notifier;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// `None` when no Resend key is configured; notifications are skipped.
    pub notifier: Option<Arc<Notifier>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &f2f_db::DbError) -> ApiError {
    match error {
        f2f_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        f2f_db::DbError::Domain(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        f2f_db::DbError::NoPlannedDate(_) => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        f2f_db::DbError::InvalidImportRunTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/v1/orders/{id}", get(orders::get_order))
        .route("/api/v1/orders/{id}/status", put(orders::update_status))
        .route(
            "/api/v1/orders/{id}/payment-status",
            put(orders::update_payment_status),
        )
        .route("/api/v1/orders/{id}/items", put(orders::update_items))
        .route(
            "/api/v1/orders/{id}/shipment",
            post(orders::attach_shipment).delete(orders::detach_shipment),
        )
        .route("/api/v1/shipments", get(shipments::list_shipments))
        .route("/api/v1/shipments/refresh", post(shipments::refresh_upcoming))
        .route("/api/v1/shipments/{id}", get(shipments::get_shipment))
        .route(
            "/api/v1/shipments/{id}/orders",
            get(shipments::list_shipment_orders),
        )
        .route(
            "/api/v1/shipments/{id}/summary",
            get(shipments::get_shipment_summary),
        )
        .route(
            "/api/v1/shipments/{id}/refresh",
            post(shipments::refresh_shipment),
        )
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/{id}", get(catalog::get_product))
        .route("/api/v1/products/{id}/stock", put(catalog::update_stock))
        .route(
            "/api/v1/products/{id}/bundle-items",
            get(catalog::list_bundle_items).put(catalog::replace_bundle_items),
        )
        .route(
            "/api/v1/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/v1/categories/{id}/parent",
            put(catalog::set_category_parent),
        )
        .route("/api/v1/producers", get(catalog::list_producers))
        .route(
            "/api/v1/email-templates",
            get(email_templates::list_templates),
        )
        .route(
            "/api/v1/email-templates/test",
            post(email_templates::send_test_email),
        )
        .route(
            "/api/v1/email-templates/{trigger}",
            put(email_templates::upsert_template),
        )
        .route(
            "/api/v1/email-templates/{trigger}/enabled",
            put(email_templates::set_enabled),
        )
        .route("/api/v1/import-runs", get(import_runs::list_import_runs))
        .route("/api/v1/import-runs/{id}", get(import_runs::get_import_run))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match f2f_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app(pool: PgPool) -> Router {
        let auth = AuthState::from_keys("", "test-salt", true).expect("auth");
        build_app(
            AppState {
                pool,
                notifier: None,
            },
            auth,
            default_rate_limit_state(),
        )
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_upstream_error_maps_to_bad_gateway() {
        let response = ApiError::new("req-1", "upstream_error", "resend failed").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn map_db_error_distinguishes_client_errors() {
        let not_found = map_db_error("r".to_string(), &f2f_db::DbError::NotFound);
        assert_eq!(not_found.error.code, "not_found");

        let domain = map_db_error(
            "r".to_string(),
            &f2f_db::DbError::Domain(f2f_core::CoreError::RootCategoryParent),
        );
        assert_eq!(domain.error.code, "validation_error");

        let no_date = map_db_error(
            "r".to_string(),
            &f2f_db::DbError::NoPlannedDate("F2F-1".to_string()),
        );
        assert_eq!(no_date.error.code, "conflict");

        let other = map_db_error(
            "r".to_string(),
            &f2f_db::DbError::Sqlx(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(other.error.code, "internal_error");
        assert_eq!(other.error.message, "database query failed");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn health_reports_ok_with_live_database(pool: PgPool) {
        let response = test_app(pool)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = json_body(response).await;
        assert_eq!(json["data"]["status"], "ok");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn protected_routes_require_bearer_token_when_keys_configured(pool: PgPool) {
        let auth = AuthState::from_keys("secret-key", "test-salt", false).expect("auth");
        let app = build_app(
            AppState {
                pool,
                notifier: None,
            },
            auth,
            default_rate_limit_state(),
        );

        let denied = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/shipments")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/shipments")
                    .header(header::AUTHORIZATION, "Bearer secret-key")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn creating_dated_orders_consolidates_them_into_one_shipment(pool: PgPool) {
        let app = test_app(pool.clone());
        let order = serde_json::json!({
            "customer_name": "Kiss Anna",
            "billing_emails": ["anna@example.com"],
            "planned_shipping_date": "2030-05-14",
            "items": [{
                "id": "1",
                "name": "Sárgarépa",
                "quantity": "2",
                "net_price": "500",
                "gross_price": "635",
                "subtotal": "1270"
            }]
        });

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/api/v1/orders", &order))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/shipments")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1, "both orders share one shipment");
        assert_eq!(data[0]["date"], "2030-05-14");
        assert_eq!(data[0]["order_count"], 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn stored_order_is_created_even_when_shipment_batching_fails(pool: PgPool) {
        sqlx::query(
            "CREATE FUNCTION reject_shipment() RETURNS trigger AS $$ \
             BEGIN RAISE EXCEPTION 'shipments are read-only'; END; $$ LANGUAGE plpgsql",
        )
        .execute(&pool)
        .await
        .expect("create function");
        sqlx::query(
            "CREATE TRIGGER reject_shipment BEFORE INSERT ON shipments \
             FOR EACH ROW EXECUTE FUNCTION reject_shipment()",
        )
        .execute(&pool)
        .await
        .expect("create trigger");

        let response = test_app(pool.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/orders",
                &serde_json::json!({
                    "customer_name": "Kiss Anna",
                    "planned_shipping_date": "2030-05-14"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert!(json["data"]["shipment_id"].is_null());

        let id = json["data"]["id"].as_str().expect("order id");
        let stored = f2f_db::get_order(&pool, id).await.expect("order is stored");
        assert!(stored.shipment_id.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn ordering_more_than_in_stock_is_a_validation_error(pool: PgPool) {
        let product_id = f2f_db::insert_product(
            &pool,
            &f2f_db::ProductWrite {
                name: "Tojás".to_string(),
                slug: "tojas".to_string(),
                sku: None,
                unit: Some("db".to_string()),
                size: None,
                bio: false,
                net_price: rust_decimal::Decimal::from(100),
                net_price_vip: rust_decimal::Decimal::from(100),
                net_price_company: rust_decimal::Decimal::from(100),
                gross_price: rust_decimal::Decimal::from(127),
                vat_percent: rust_decimal::Decimal::from(27),
                stock: Some(rust_decimal::Decimal::from(2)),
                backorder: false,
                product_type: f2f_core::ProductType::Simple,
                producer_id: None,
                featured_image: None,
                enabled: true,
                woo_id: None,
            },
        )
        .await
        .expect("insert product");

        let response = test_app(pool)
            .oneshot(json_request(
                "POST",
                "/api/v1/orders",
                &serde_json::json!({
                    "customer_name": "Kiss Anna",
                    "items": [{
                        "id": product_id.to_string(),
                        "product_id": product_id,
                        "name": "Tojás",
                        "quantity": "5",
                        "net_price": "100",
                        "gross_price": "127",
                        "subtotal": "635"
                    }]
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn unknown_order_returns_404(pool: PgPool) {
        let response = test_app(pool)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders/F2F-DOES-NOT-EXIST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn attaching_undated_order_is_a_conflict(pool: PgPool) {
        let app = test_app(pool);
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/orders",
                &serde_json::json!({ "customer_name": "Nagy Béla" }),
            ))
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = json_body(created).await["data"]["id"]
            .as_str()
            .expect("order id")
            .to_string();

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/orders/{id}/shipment"),
                &serde_json::json!({}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn category_cannot_be_its_own_parent(pool: PgPool) {
        let app = test_app(pool);
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/categories",
                &serde_json::json!({ "name": "Zöldség", "slug": "zoldseg" }),
            ))
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = json_body(created).await["data"]["id"]
            .as_i64()
            .expect("category id");

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/categories/{id}/parent"),
                &serde_json::json!({ "parent_id": id }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
