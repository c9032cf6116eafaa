//! Conversion from raw WooCommerce types into import drafts and core orders.
//!
//! Catalog entities become `*Draft` values that the importer diffs against
//! stored rows. Orders map straight to [`f2f_core::Order`]; their money
//! fields are copied from WooCommerce rather than recomputed.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use f2f_core::{
    Address, Order, OrderHistory, OrderItem, OrderStatus, OrderTotals, PaymentMethod,
    PaymentStatus, ProductType, ShippingMethod,
};
use rust_decimal::Decimal;

use crate::error::WooError;
use crate::types::{
    meta_value, WooAddress, WooCategory, WooLineItem, WooOrder, WooProducer, WooProduct,
};

const DEFAULT_VAT_PERCENT: Decimal = Decimal::from_parts(27, 0, 0, false, 0);
const DEFAULT_PAYMENT_DUE_DAYS: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDraft {
    pub woo_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub order: i32,
    pub image_src: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProducerDraft {
    pub woo_id: i64,
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub bio: bool,
    pub image_src: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub woo_id: i64,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub size: Option<String>,
    pub bio: bool,
    pub net_price: Decimal,
    pub net_price_vip: Decimal,
    pub net_price_company: Decimal,
    pub gross_price: Decimal,
    pub vat_percent: Decimal,
    pub stock: Option<Decimal>,
    pub backorder: bool,
    pub product_type: ProductType,
    pub enabled: bool,
    /// WooCommerce id of the producer, from the `producer_id` meta.
    pub woo_producer_id: Option<i64>,
    /// Producer display name, from the `producer` meta.
    pub producer_name: Option<String>,
    pub category_names: Vec<String>,
    pub image_src: Option<String>,
}

#[must_use]
pub fn normalize_category(category: &WooCategory) -> CategoryDraft {
    CategoryDraft {
        woo_id: category.id,
        name: category.name.trim().to_owned(),
        slug: category.slug.clone(),
        description: category.description.clone(),
        order: category.menu_order,
        image_src: category
            .image
            .as_ref()
            .map(|image| image.src.clone())
            .filter(|src| !src.is_empty()),
    }
}

#[must_use]
pub fn normalize_producer(producer: &WooProducer) -> ProducerDraft {
    let slug = if producer.slug.is_empty() {
        f2f_core::slugify(&producer.name)
    } else {
        producer.slug.clone()
    };
    ProducerDraft {
        woo_id: producer.id,
        name: producer.name.trim().to_owned(),
        slug,
        short_description: non_empty(&producer.short_description),
        description: non_empty(&producer.description),
        bio: is_truthy(meta_value(&producer.meta_data, "bio").as_deref()),
        image_src: producer
            .image
            .as_ref()
            .map(|image| image.src.clone())
            .filter(|src| !src.is_empty()),
    }
}

/// Normalizes a WooCommerce product.
///
/// The storefront price is gross; the net price is derived from the VAT
/// rate (`vat_percent` meta, default 27%). VIP and company prices fall back
/// to the net price when their metas are missing.
///
/// # Errors
///
/// Returns [`WooError::Normalization`] if a price field is not a decimal.
pub fn normalize_product(product: &WooProduct) -> Result<ProductDraft, WooError> {
    let meta = &product.meta_data;
    let price = if product.price.trim().is_empty() {
        &product.regular_price
    } else {
        &product.price
    };
    let gross_price = parse_money("product", product.id, "price", price)?;
    let vat_percent = match meta_value(meta, "vat_percent") {
        Some(raw) => parse_money("product", product.id, "vat_percent", &raw)?,
        None => DEFAULT_VAT_PERCENT,
    };
    let net_price = net_from_gross(gross_price, vat_percent);
    let net_price_vip = match meta_value(meta, "net_price_vip") {
        Some(raw) => parse_money("product", product.id, "net_price_vip", &raw)?,
        None => net_price,
    };
    let net_price_company = match meta_value(meta, "net_price_company") {
        Some(raw) => parse_money("product", product.id, "net_price_company", &raw)?,
        None => net_price,
    };

    let stock = if product.manage_stock {
        Some(
            product
                .stock_quantity
                .map_or(Ok(Decimal::ZERO), |qty| decimal_from_f64("product", product.id, qty))?,
        )
    } else {
        None
    };

    let product_type = match product.product_type.as_str() {
        "woosb" | "bundle" | "grouped" => ProductType::Bundle,
        _ => ProductType::Simple,
    };

    Ok(ProductDraft {
        woo_id: product.id,
        name: product.name.trim().to_owned(),
        slug: product.slug.clone(),
        sku: non_empty(&product.sku),
        unit: meta_value(meta, "unit"),
        size: meta_value(meta, "size"),
        bio: is_truthy(meta_value(meta, "bio").as_deref()),
        net_price,
        net_price_vip,
        net_price_company,
        gross_price,
        vat_percent,
        stock,
        backorder: !matches!(product.backorders.as_str(), "" | "no"),
        product_type,
        enabled: product.status == "publish",
        woo_producer_id: meta_value(meta, "producer_id").and_then(|v| v.parse::<i64>().ok()),
        producer_name: meta_value(meta, "producer"),
        category_names: product.categories.iter().map(|c| c.name.clone()).collect(),
        image_src: product
            .images
            .first()
            .map(|image| image.src.clone())
            .filter(|src| !src.is_empty()),
    })
}

/// Maps a WooCommerce order status to the local order and payment status.
///
/// Unknown statuses fall back to `pending`/`pending`.
#[must_use]
pub fn map_order_status(woo_status: &str, paid_online: bool) -> (OrderStatus, PaymentStatus) {
    let online_payment = if paid_online {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    };
    match woo_status {
        "processing" => (OrderStatus::Processing, online_payment),
        "shipping" => (OrderStatus::Shipping, online_payment),
        "completed" => (OrderStatus::Delivered, PaymentStatus::Closed),
        "failed" => (OrderStatus::Cancelled, PaymentStatus::Failed),
        "cancelled" | "trash" => (OrderStatus::Cancelled, PaymentStatus::Refunded),
        "pending" | "new-order" | "on-hold" | "auto-draft" => {
            (OrderStatus::Pending, PaymentStatus::Pending)
        }
        other => {
            tracing::warn!(status = other, "unknown WooCommerce order status, treating as pending");
            (OrderStatus::Pending, PaymentStatus::Pending)
        }
    }
}

/// Splits a `pickup_time` meta (`YYYY-MM-DD HH:MM`) into date and time.
///
/// A value with only a date yields no time; an unparseable date yields
/// `(None, None)`.
#[must_use]
pub fn parse_pickup_time(raw: &str) -> (Option<NaiveDate>, Option<String>) {
    let mut parts = raw.trim().splitn(2, ' ');
    let date = parts
        .next()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    if date.is_none() {
        return (None, None);
    }
    let time = parts.next().map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned);
    (date, time)
}

/// Normalizes a WooCommerce order.
///
/// `product_ids` maps WooCommerce product ids to local product ids; lines
/// whose product is unknown keep `product_id = None`.
///
/// # Errors
///
/// Returns [`WooError::Normalization`] if a money field is not a decimal or
/// the creation date is missing or malformed.
pub fn normalize_order(
    order: &WooOrder,
    product_ids: &HashMap<i64, i64>,
) -> Result<Order, WooError> {
    let date_created = parse_created_at(order)?;
    let paid_online = order.payment_method.contains("simplepay");
    let (order_status, payment_status) = map_order_status(&order.status, paid_online);

    let total = parse_money("order", order.id, "total", &order.total)?;
    let tax = parse_money("order", order.id, "total_tax", &order.total_tax)?;

    let shipping_line = order.shipping_lines.first();
    let shipping_cost = match shipping_line {
        Some(line) => {
            parse_money("order", order.id, "shipping total", &line.total)?
                + parse_money("order", order.id, "shipping tax", &line.total_tax)?
        }
        None => Decimal::ZERO,
    };
    let surcharge_amount = match order.fee_lines.first() {
        Some(fee) => {
            parse_money("order", order.id, "fee total", &fee.total)?
                + parse_money("order", order.id, "fee tax", &fee.total_tax)?
        }
        None => Decimal::ZERO,
    };

    let payed_amount = if order.status == "completed" {
        total
    } else if paid_online {
        match meta_value(&order.meta_data, "approved") {
            Some(raw) => parse_money("order", order.id, "approved", &raw)?,
            None => Decimal::ZERO,
        }
    } else {
        Decimal::ZERO
    };

    let (planned_shipping_date, shipment_time) = shipping_line
        .and_then(|line| meta_value(&line.meta_data, "pickup_time"))
        .map_or((None, None), |raw| parse_pickup_time(&raw));

    let shipping_method = match shipping_line.filter(|line| !line.method_id.is_empty()) {
        Some(line) => ShippingMethod {
            id: 0,
            name: if line.method_id == "pickup_location" {
                "Személyes átvétel".to_owned()
            } else {
                "Házhozszállítás".to_owned()
            },
            description: None,
            cost: shipping_cost,
        },
        None => ShippingMethod {
            id: 0,
            name: "Nincs kiszállítás".to_owned(),
            description: None,
            cost: Decimal::ZERO,
        },
    };

    let items = order
        .line_items
        .iter()
        .map(|line| normalize_line_item(order.id, line, product_ids))
        .collect::<Result<Vec<_>, _>>()?;

    let billing_email = order.billing.email.clone().filter(|e| !e.is_empty());
    let emails: Vec<String> = billing_email.iter().cloned().collect();

    Ok(Order {
        id: order.id.to_string(),
        date_created,
        updated_at: date_created,
        customer_id: None,
        customer_name: person_name(&order.billing),
        billing_emails: emails.clone(),
        notify_emails: emails,
        note: order.customer_note.clone(),
        shipping_address: Some(address(&order.shipping, billing_email.as_deref(), None)),
        billing_address: Some(address(
            &order.billing,
            billing_email.as_deref(),
            meta_value(&order.meta_data, "_billing_tax_number"),
        )),
        deny_invoice: meta_value(&order.meta_data, "innvoice_block_create").as_deref() == Some("1"),
        need_vat: true,
        items,
        totals: OrderTotals {
            subtotal: total - tax,
            shipping_cost,
            vat_total: tax,
            discount_total: Decimal::ZERO,
            surcharge_amount,
            total,
        },
        payed_amount,
        shipping_method: Some(shipping_method),
        payment_method: Some(payment_method(&order.payment_method)),
        order_status,
        payment_status,
        payment_due_days: meta_value(&order.meta_data, "innvoice_payment_due")
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(DEFAULT_PAYMENT_DUE_DAYS),
        courier: meta_value(&order.meta_data, "futar"),
        planned_shipping_date,
        shipment_time,
        history: OrderHistory::created(date_created),
        shipment_id: None,
        history_for_user: meta_value(&order.meta_data, "change_log").unwrap_or_default(),
        woo_customer_id: (order.customer_id > 0).then_some(order.customer_id),
    })
}

fn normalize_line_item(
    order_id: i64,
    line: &WooLineItem,
    product_ids: &HashMap<i64, i64>,
) -> Result<OrderItem, WooError> {
    let mut quantity = decimal_from_f64("order", order_id, line.quantity)?;
    if quantity <= Decimal::ZERO {
        quantity = Decimal::ONE;
    }
    let line_subtotal = parse_money("order", order_id, "line subtotal", &line.subtotal)?;
    let line_total = parse_money("order", order_id, "line total", &line.total)?;
    let line_tax = parse_money("order", order_id, "line tax", &line.total_tax)?;

    let vat_percent = (line_total > Decimal::ZERO)
        .then(|| (line_tax / line_total * Decimal::ONE_HUNDRED).round());
    let note = [
        meta_value(&line.meta_data, "note"),
        meta_value(&line.meta_data, "custom_note"),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    Ok(OrderItem {
        id: line.id.to_string(),
        product_id: product_ids.get(&line.product_id).copied(),
        name: line.name.clone(),
        size: None,
        unit: None,
        quantity,
        net_price: (line_subtotal / quantity).round_dp(2),
        gross_price: ((line_total + line_tax) / quantity).round_dp(2),
        vat_percent,
        subtotal: line_total,
        note: non_empty(&note),
        custom: line.product_id == 0,
        cover_url: None,
    })
}

fn payment_method(woo_method: &str) -> PaymentMethod {
    let (slug, name) = if woo_method.contains("simplepay") {
        ("simple", "SimplePay fizetés")
    } else if woo_method == "cheque" {
        ("utalas", "Átutalás")
    } else {
        ("utanvet", "Utánvét")
    };
    PaymentMethod {
        id: 0,
        slug: slug.to_owned(),
        name: name.to_owned(),
    }
}

fn address(source: &WooAddress, fallback_email: Option<&str>, tax_number: Option<String>) -> Address {
    Address {
        name: person_name(source),
        company: non_empty(&source.company),
        tax_number,
        postcode: non_empty(&source.postcode),
        city: non_empty(&source.city),
        street: non_empty(&source.address_1),
        house_number: non_empty(&source.address_2),
        floor: None,
        doorbell: None,
        phone: source.phone.clone().filter(|p| !p.is_empty()),
        email: source
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| fallback_email.map(str::to_owned)),
        note: None,
    }
}

/// Hungarian name order: family name first.
fn person_name(address: &WooAddress) -> String {
    format!("{} {}", address.last_name.trim(), address.first_name.trim())
        .trim()
        .to_owned()
}

fn parse_created_at(order: &WooOrder) -> Result<DateTime<Utc>, WooError> {
    let raw = order
        .date_created_gmt
        .as_deref()
        .ok_or_else(|| WooError::Normalization {
            entity: "order",
            woo_id: order.id,
            reason: "missing date_created_gmt".to_owned(),
        })?;
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| WooError::Normalization {
            entity: "order",
            woo_id: order.id,
            reason: format!("invalid date_created_gmt \"{raw}\": {e}"),
        })
}

/// Parses a WooCommerce money string; blank means zero.
fn parse_money(
    entity: &'static str,
    woo_id: i64,
    field: &str,
    raw: &str,
) -> Result<Decimal, WooError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed).map_err(|e| WooError::Normalization {
        entity,
        woo_id,
        reason: format!("{field} \"{trimmed}\" is not a decimal: {e}"),
    })
}

fn decimal_from_f64(entity: &'static str, woo_id: i64, value: f64) -> Result<Decimal, WooError> {
    Decimal::try_from(value).map_err(|e| WooError::Normalization {
        entity,
        woo_id,
        reason: format!("quantity {value} is not representable: {e}"),
    })
}

fn net_from_gross(gross: Decimal, vat_percent: Decimal) -> Decimal {
    let divisor = Decimal::ONE + vat_percent / Decimal::ONE_HUNDRED;
    if divisor.is_zero() {
        return gross;
    }
    (gross / divisor).round_dp(2)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "yes" | "on"))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
