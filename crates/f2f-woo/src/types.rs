//! WooCommerce REST (`wc/v3`) response types.
//!
//! ## Observed shape
//!
//! ### Money
//! Every amount (`price`, `total`, `total_tax`, line `subtotal`, ...) arrives
//! as a decimal **string**, e.g. `"1990.00"`. Empty strings appear on products
//! without a price. We keep them as `String` and parse in `normalize.rs`.
//!
//! ### `meta_data`
//! A list of `{id, key, value}` objects. `value` is usually a string but
//! plugins also store numbers, booleans and objects, so it is kept as raw
//! JSON and read through [`meta_value`].
//!
//! ### Producers
//! `producers` is a custom endpoint registered by the shop's theme. Its items
//! look like taxonomy terms: `id`, `name`, `slug`, `description`, optional
//! `image`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct WooImage {
    #[serde(default)]
    pub id: i64,
    pub src: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooMeta {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// WooCommerce id of the parent category; `0` for top-level categories.
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<WooImage>,
    #[serde(default)]
    pub menu_order: i32,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooProducer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub image: Option<WooImage>,
    #[serde(default)]
    pub meta_data: Vec<WooMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooCategoryRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooProduct {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// `simple`, `variable`, `woosb` (product bundle plugin), ...
    #[serde(rename = "type", default)]
    pub product_type: String,
    /// `publish`, `draft`, `private`, `pending`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub manage_stock: bool,
    #[serde(default)]
    pub stock_quantity: Option<f64>,
    /// `no`, `notify` or `yes`.
    #[serde(default)]
    pub backorders: String,
    #[serde(default)]
    pub categories: Vec<WooCategoryRef>,
    #[serde(default)]
    pub images: Vec<WooImage>,
    #[serde(default)]
    pub meta_data: Vec<WooMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WooAddress {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub postcode: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooLineItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub quantity: f64,
    /// Net line amount before discounts.
    #[serde(default)]
    pub subtotal: String,
    /// Net line amount after discounts.
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub total_tax: String,
    #[serde(default)]
    pub meta_data: Vec<WooMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooShippingLine {
    #[serde(default)]
    pub method_id: String,
    #[serde(default)]
    pub method_title: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub total_tax: String,
    #[serde(default)]
    pub meta_data: Vec<WooMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooFeeLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub total_tax: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WooOrder {
    pub id: i64,
    pub status: String,
    /// UTC creation time without offset, e.g. `2024-05-02T08:15:00`.
    #[serde(default)]
    pub date_created_gmt: Option<String>,
    #[serde(default)]
    pub customer_id: i64,
    #[serde(default)]
    pub customer_note: String,
    #[serde(default)]
    pub billing: WooAddress,
    #[serde(default)]
    pub shipping: WooAddress,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub total_tax: String,
    #[serde(default)]
    pub line_items: Vec<WooLineItem>,
    #[serde(default)]
    pub shipping_lines: Vec<WooShippingLine>,
    #[serde(default)]
    pub fee_lines: Vec<WooFeeLine>,
    #[serde(default)]
    pub meta_data: Vec<WooMeta>,
}

/// Looks up a meta value by key and renders it as a string.
///
/// Strings are returned as-is, numbers and booleans via their JSON form.
/// Missing keys, `null` and empty strings give `None`.
#[must_use]
pub fn meta_value(meta: &[WooMeta], key: &str) -> Option<String> {
    let value = &meta.iter().find(|m| m.key == key)?.value;
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!rendered.is_empty()).then_some(rendered)
}
