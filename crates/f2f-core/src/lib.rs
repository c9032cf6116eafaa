pub mod app_config;
pub mod catalog;
pub mod config;
pub mod email_templates;
pub mod orders;
pub mod shipments;

pub use app_config::{AppConfig, Environment, WooConfig};
pub use catalog::{
    slugify, validate_category_parent, BundleItem, Category, CustomerType, Producer, Product, ProductType,
    ROOT_CATEGORY_ID,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use email_templates::{load_email_templates, EmailTemplate, EmailTemplatesFile, EmailTrigger};
pub use orders::{
    check_availability, Actor, Address, HistoryEntry, HistoryKind, HistoryStatus, ItemsUpdate, NewOrder, Order,
    OrderHistory, OrderItem, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ShippingMethod,
};
pub use shipments::{
    shipment_counters, summarize_shipment_items, Shipment, ShipmentCounters, ShipmentItemSummary,
    ShipmentSummary,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),

    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    #[error("invalid product type: {0}")]
    InvalidProductType(String),

    #[error("invalid customer type: {0}")]
    InvalidCustomerType(String),

    #[error("invalid email trigger: {0}")]
    InvalidEmailTrigger(String),

    #[error("category {0} cannot be its own parent")]
    SelfParentCategory(i64),

    #[error("the root category (id 8) cannot have a parent")]
    RootCategoryParent,

    #[error("product {product_id} ({name}) is not available in quantity {requested}; in stock: {stock}")]
    Unavailable {
        product_id: i64,
        name: String,
        requested: rust_decimal::Decimal,
        stock: rust_decimal::Decimal,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read email templates file {path}: {source}")]
    TemplatesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse email templates file: {0}")]
    TemplatesFileParse(#[source] serde_yaml::Error),

    #[error("email template validation failed: {0}")]
    Validation(String),
}
