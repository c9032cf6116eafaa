//! Offline unit tests for f2f-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::{NaiveDate, Utc};
use f2f_core::{
    AppConfig, CoreError, Environment, OrderHistory, OrderStatus, PaymentStatus, Product,
    ProductType,
};
use f2f_db::{DbError, ImportRunRow, OrderRow, PoolConfig, ProductRow, ShipmentRow};
use rust_decimal_macros::dec;
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

fn product_row(product_type: &str) -> ProductRow {
    ProductRow {
        id: 42,
        name: "Bio sárgarépa".to_string(),
        slug: "bio-sargarepa".to_string(),
        sku: Some("F2F-042".to_string()),
        unit: Some("kg".to_string()),
        size: Some("1".to_string()),
        bio: true,
        net_price: dec!(800),
        net_price_vip: dec!(720),
        net_price_company: dec!(700),
        gross_price: dec!(1016),
        vat_percent: dec!(27),
        stock: Some(dec!(12.5)),
        backorder: false,
        product_type: product_type.to_string(),
        producer_id: Some(3),
        featured_image: None,
        enabled: true,
        woo_id: Some(9001),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn order_row(order_status: &str) -> OrderRow {
    let now = Utc::now();
    OrderRow {
        id: "1000".to_string(),
        date_created: now,
        updated_at: now,
        customer_id: None,
        customer_name: "Kiss Anna".to_string(),
        billing_emails: vec!["anna@example.hu".to_string()],
        notify_emails: vec![],
        note: String::new(),
        shipping_address: None,
        billing_address: None,
        deny_invoice: false,
        need_vat: false,
        surcharge_amount: dec!(0),
        items: Json(vec![]),
        subtotal: dec!(0),
        shipping_cost: dec!(990),
        vat_total: dec!(0),
        discount_total: dec!(0),
        total: dec!(990),
        payed_amount: dec!(0),
        shipping_method: None,
        payment_method: None,
        order_status: order_status.to_string(),
        payment_status: "pending".to_string(),
        payment_due_days: 8,
        courier: None,
        planned_shipping_date: NaiveDate::from_ymd_opt(2026, 11, 3),
        shipment_time: Some("10:00".to_string()),
        history: Json(OrderHistory::created(now)),
        shipment_id: None,
        history_for_user: String::new(),
        woo_customer_id: None,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        api_key_hash_salt: "salt".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        woo: None,
        woo_request_timeout_secs: 30,
        woo_user_agent: "ua".to_string(),
        woo_per_page: 100,
        woo_max_retries: 3,
        woo_retry_backoff_base_secs: 2,
        image_upload_url: None,
        resend_api_key: None,
        resend_base_url: "https://api.resend.com".to_string(),
        from_email: "Farm2Fork webshop <noreply@farm2fork.hu>".to_string(),
        email_templates_path: PathBuf::from("./config/email_templates.yaml"),
        shipment_reconcile_cron: "0 */15 * * * *".to_string(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn pool_config_default_matches_documented_values() {
    let config = PoolConfig::default();
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.min_connections, 1);
    assert_eq!(config.acquire_timeout_secs, 10);
}

#[test]
fn product_row_converts_to_domain_product() {
    let product = Product::try_from(product_row("bundle")).expect("valid row");
    assert_eq!(product.id, 42);
    assert_eq!(product.product_type, ProductType::Bundle);
    assert!(product.is_bundle());
    assert_eq!(product.stock, Some(dec!(12.5)));
    assert_eq!(product.woo_id, Some(9001));
}

#[test]
fn product_row_with_unknown_type_is_a_domain_error() {
    let err = Product::try_from(product_row("variable")).unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InvalidProductType(ref t)) if t == "variable"
    ));
}

#[test]
fn order_row_converts_statuses_and_totals() {
    let order = f2f_core::Order::try_from(order_row("shipping")).expect("valid row");
    assert_eq!(order.order_status, OrderStatus::Shipping);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.totals.shipping_cost, dec!(990));
    assert_eq!(order.totals.total, dec!(990));
    assert_eq!(order.history.len(), 1);
}

#[test]
fn order_row_with_unknown_status_is_rejected() {
    let err = f2f_core::Order::try_from(order_row("lost")).unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InvalidOrderStatus(_))));
}

#[test]
fn shipment_row_converts_counters() {
    let row = ShipmentRow {
        id: 5,
        date: NaiveDate::from_ymd_opt(2026, 11, 3).expect("valid date"),
        product_count: 4,
        product_amount: dec!(12500),
        order_count: 2,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let shipment = f2f_core::Shipment::from(row);
    assert_eq!(shipment.id, 5);
    assert_eq!(shipment.order_count, 2);
    assert_eq!(shipment.product_amount, dec!(12500));
}

/// Compile-time smoke test: confirm that [`ImportRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn import_run_row_has_expected_fields() {
    use uuid::Uuid;

    let row = ImportRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        dry_run: true,
        started_at: None,
        completed_at: None,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "queued");
    assert!(row.dry_run);
    assert!(row.started_at.is_none());
    assert!(row.error_message.is_none());
}
