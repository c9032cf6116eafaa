use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{BundleItem, Product};
use crate::orders::Order;

/// Orders grouped for picking and packing on a single delivery date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    pub date: NaiveDate,
    pub product_count: i64,
    pub product_amount: Decimal,
    pub order_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCounters {
    pub order_count: i64,
    pub product_count: i64,
    pub product_amount: Decimal,
}

/// Recompute the stored counters of a shipment from its member orders.
///
/// Cancelled and refunded orders do not count. `product_count` is the number
/// of distinct products across the remaining orders and `product_amount` the
/// sum of their line subtotals.
#[must_use]
pub fn shipment_counters(orders: &[Order]) -> ShipmentCounters {
    let mut products = HashSet::new();
    let mut order_count = 0_i64;
    let mut product_amount = Decimal::ZERO;

    for order in orders.iter().filter(|o| o.order_status.is_active()) {
        order_count += 1;
        for item in &order.items {
            products.insert(item.product_key());
            product_amount += item.subtotal;
        }
    }

    ShipmentCounters {
        order_count,
        product_count: i64::try_from(products.len()).unwrap_or(i64::MAX),
        product_amount,
    }
}

/// One row of the pick list for a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentItemSummary {
    /// Grouping key, `"{name}-{size}-{unit}"`; bundle children append `-bundle-{product_id}`.
    pub id: String,
    pub name: String,
    pub size: Option<String>,
    pub unit: Option<String>,
    pub total_quantity: Decimal,
    pub average_price: Decimal,
    pub total_value: Decimal,
    pub order_count: usize,
    pub customers_count: usize,
    pub customers: Vec<String>,
    pub product_id: Option<i64>,
    pub is_bio: bool,
    pub is_bundle_item: bool,
    pub parent_quantity: Option<Decimal>,
    pub individual_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentSummary {
    pub order_count: usize,
    /// Number of rows that are not bundle children.
    pub product_count: usize,
    /// Sum of the grand totals of the counted orders.
    pub product_amount: Decimal,
    pub items: Vec<ShipmentItemSummary>,
}

struct Group<'a> {
    key: String,
    name: &'a str,
    size: Option<&'a str>,
    unit: Option<&'a str>,
    product_id: Option<i64>,
    total_quantity: Decimal,
    price_sum: Decimal,
    price_count: u32,
    orders: HashSet<&'a str>,
    customers: Vec<&'a str>,
}

/// Aggregate every line item of the given orders into a pick list.
///
/// Items are grouped by name, size and unit. Groups are sorted by total value
/// (highest first, then by name). A group whose product is a bundle with
/// composition rows is followed by one child row per component, with the
/// component quantity scaled by the group's total quantity.
#[must_use]
pub fn summarize_shipment_items(
    orders: &[Order],
    products: &HashMap<i64, Product>,
    bundles: &HashMap<i64, Vec<BundleItem>>,
) -> ShipmentSummary {
    let active: Vec<&Order> = orders.iter().filter(|o| o.order_status.is_active()).collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<'_>> = Vec::new();

    for order in &active {
        for item in &order.items {
            let key = format!(
                "{}-{}-{}",
                item.name,
                item.size.as_deref().unwrap_or_default(),
                item.unit.as_deref().unwrap_or_default()
            );
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push(Group {
                    key,
                    name: &item.name,
                    size: item.size.as_deref(),
                    unit: item.unit.as_deref(),
                    product_id: item.catalog_product_id(),
                    total_quantity: Decimal::ZERO,
                    price_sum: Decimal::ZERO,
                    price_count: 0,
                    orders: HashSet::new(),
                    customers: Vec::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.total_quantity += item.quantity;
            group.price_sum += item.net_price;
            group.price_count += 1;
            group.orders.insert(&order.id);
            if !group.customers.contains(&order.customer_name.as_str()) {
                group.customers.push(&order.customer_name);
            }
        }
    }

    let mut parents: Vec<ShipmentItemSummary> = groups
        .iter()
        .map(|g| {
            let average_price = if g.price_count == 0 {
                Decimal::ZERO
            } else {
                g.price_sum / Decimal::from(g.price_count)
            };
            ShipmentItemSummary {
                id: g.key.clone(),
                name: g.name.to_string(),
                size: g.size.map(str::to_string),
                unit: g.unit.map(str::to_string),
                total_quantity: g.total_quantity,
                average_price,
                total_value: g.total_quantity * average_price,
                order_count: g.orders.len(),
                customers_count: g.customers.len(),
                customers: g.customers.iter().map(|c| (*c).to_string()).collect(),
                product_id: g.product_id,
                is_bio: g
                    .product_id
                    .and_then(|id| products.get(&id))
                    .is_some_and(|p| p.bio),
                is_bundle_item: false,
                parent_quantity: None,
                individual_quantity: None,
            }
        })
        .collect();

    parents.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut items = Vec::with_capacity(parents.len());
    for parent in parents {
        let children = bundle_children(&parent, products, bundles);
        items.push(parent);
        items.extend(children);
    }

    ShipmentSummary {
        order_count: active.len(),
        product_count: items.iter().filter(|i| !i.is_bundle_item).count(),
        product_amount: active.iter().map(|o| o.totals.total).sum(),
        items,
    }
}

fn bundle_children(
    parent: &ShipmentItemSummary,
    products: &HashMap<i64, Product>,
    bundles: &HashMap<i64, Vec<BundleItem>>,
) -> Vec<ShipmentItemSummary> {
    let Some(product_id) = parent.product_id else {
        return Vec::new();
    };
    if !products.get(&product_id).is_some_and(Product::is_bundle) {
        return Vec::new();
    }
    let Some(components) = bundles.get(&product_id) else {
        return Vec::new();
    };

    components
        .iter()
        .map(|component| {
            let child = products.get(&component.product_id);
            ShipmentItemSummary {
                id: format!("{}-bundle-{}", parent.id, component.product_id),
                name: child.map_or_else(|| "Unknown".to_string(), |p| p.name.clone()),
                size: child.and_then(|p| p.size.clone()),
                unit: Some(
                    child
                        .and_then(|p| p.unit.clone())
                        .unwrap_or_else(|| "db".to_string()),
                ),
                total_quantity: component.qty * parent.total_quantity,
                average_price: Decimal::ZERO,
                total_value: Decimal::ZERO,
                order_count: parent.order_count,
                customers_count: parent.customers_count,
                customers: parent.customers.clone(),
                product_id: Some(component.product_id),
                is_bio: child.is_some_and(|p| p.bio),
                is_bundle_item: true,
                parent_quantity: Some(parent.total_quantity),
                individual_quantity: Some(component.qty),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "shipments_test.rs"]
mod tests;
