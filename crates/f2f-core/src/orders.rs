use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CoreError, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipping,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Cancelled and refunded orders are excluded from shipment counters and
    /// item summaries.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipping" => Ok(Self::Shipping),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(CoreError::InvalidOrderStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyPaid,
    Closed,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyPaid => "partially_paid",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "partially_paid" => Ok(Self::PartiallyPaid),
            "closed" => Ok(Self::Closed),
            other => Err(CoreError::InvalidPaymentStatus(other.to_string())),
        }
    }
}

/// Status recorded on a history entry: either side of the order lifecycle.
///
/// Stored as the bare status string next to a `kind` of `order` or
/// `payment`, so `pending` and `refunded` keep their side. Entries written
/// without a `kind` resolve to an order status first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Order(OrderStatus),
    Payment(PaymentStatus),
}

impl HistoryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order(s) => s.as_str(),
            Self::Payment(s) => s.as_str(),
        }
    }

    #[must_use]
    pub fn kind(self) -> HistoryKind {
        match self {
            Self::Order(_) => HistoryKind::Order,
            Self::Payment(_) => HistoryKind::Payment,
        }
    }

    fn parse(kind: Option<HistoryKind>, status: &str) -> Result<Self, CoreError> {
        match kind {
            Some(HistoryKind::Order) => status.parse().map(Self::Order),
            Some(HistoryKind::Payment) => status.parse().map(Self::Payment),
            None => status
                .parse()
                .map(Self::Order)
                .or_else(|_| status.parse().map(Self::Payment)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Order,
    Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredHistoryEntry", into = "StoredHistoryEntry")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: HistoryStatus,
    pub note: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StoredHistoryEntry {
    timestamp: DateTime<Utc>,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<HistoryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
}

impl TryFrom<StoredHistoryEntry> for HistoryEntry {
    type Error = CoreError;

    fn try_from(raw: StoredHistoryEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: raw.timestamp,
            status: HistoryStatus::parse(raw.kind, &raw.status)?,
            note: raw.note,
            user_id: raw.user_id,
            user_name: raw.user_name,
        })
    }
}

impl From<HistoryEntry> for StoredHistoryEntry {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            status: entry.status.as_str().to_owned(),
            kind: Some(entry.status.kind()),
            note: entry.note,
            user_id: entry.user_id,
            user_name: entry.user_name,
        }
    }
}

/// Who performed a change. Both fields are optional for system-driven updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// Append-only audit log embedded in an order.
///
/// The only mutation is [`OrderHistory::push`]; existing entries are never
/// rewritten or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHistory(Vec<HistoryEntry>);

impl OrderHistory {
    /// History for a freshly created order: a single `pending` entry.
    #[must_use]
    pub fn created(at: DateTime<Utc>) -> Self {
        Self(vec![HistoryEntry {
            timestamp: at,
            status: HistoryStatus::Order(OrderStatus::Pending),
            note: Some("Rendelés létrehozva".to_string()),
            user_id: None,
            user_name: None,
        }])
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.0.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Line identifier; equals the product id for catalog items.
    pub id: String,
    #[serde(default)]
    pub product_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub net_price: Decimal,
    pub gross_price: Decimal,
    #[serde(default)]
    pub vat_percent: Option<Decimal>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl OrderItem {
    /// Identity used when counting distinct products across orders.
    #[must_use]
    pub fn product_key(&self) -> String {
        self.product_id
            .map_or_else(|| self.id.clone(), |id| id.to_string())
    }

    /// Catalog product behind the line: `product_id`, else a numeric line id.
    /// Custom lines never point at the catalog.
    #[must_use]
    pub fn catalog_product_id(&self) -> Option<i64> {
        if self.custom {
            return None;
        }
        self.product_id.or_else(|| self.id.parse().ok())
    }
}

/// Checks the catalog lines of an order against current stock.
///
/// Quantities of one product spread over several lines are summed before the
/// check. Lines whose product is not in `products` are not checked.
///
/// # Errors
///
/// Returns [`CoreError::Unavailable`] for the first product that cannot be
/// sold in the requested quantity.
pub fn check_availability(
    items: &[OrderItem],
    products: &HashMap<i64, Product>,
) -> Result<(), CoreError> {
    let mut requested: BTreeMap<i64, Decimal> = BTreeMap::new();
    for item in items {
        if let Some(id) = item.catalog_product_id() {
            *requested.entry(id).or_default() += item.quantity;
        }
    }

    for (id, qty) in requested {
        let Some(product) = products.get(&id) else {
            continue;
        };
        if !product.is_purchasable(qty) {
            return Err(CoreError::Unavailable {
                product_id: id,
                name: product.name.clone(),
                requested: qty,
                stock: product.stock.unwrap_or_default(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub name: String,
    pub company: Option<String>,
    pub tax_number: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub floor: Option<String>,
    pub doorbell: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
}

impl Address {
    /// Single-line rendering used in notifications and pick lists.
    #[must_use]
    pub fn full_address(&self) -> String {
        let street = [self.street.as_deref(), self.house_number.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        [self.postcode.as_deref(), self.city.as_deref(), Some(street.as_str())]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    /// Stable code: `simple` (online card), `utalas` (wire), `utanvet` (cash on delivery).
    pub slug: String,
    pub name: String,
}

/// Derived money fields of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub vat_total: Decimal,
    pub discount_total: Decimal,
    pub surcharge_amount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// `subtotal = Σ item.subtotal`,
    /// `total = subtotal + shipping + vat + surcharge - discount`.
    #[must_use]
    pub fn compute(
        items: &[OrderItem],
        shipping_cost: Decimal,
        vat_total: Decimal,
        surcharge_amount: Decimal,
        discount_total: Decimal,
    ) -> Self {
        let subtotal: Decimal = items.iter().map(|i| i.subtotal).sum();
        Self {
            subtotal,
            shipping_cost,
            vat_total,
            discount_total,
            surcharge_amount,
            total: subtotal + shipping_cost + vat_total + surcharge_amount - discount_total,
        }
    }
}

/// Input for creating an order. Totals are derived, never supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub billing_emails: Vec<String>,
    pub notify_emails: Vec<String>,
    pub note: String,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub deny_invoice: bool,
    pub need_vat: bool,
    pub surcharge_amount: Decimal,
    pub items: Vec<OrderItem>,
    pub shipping_cost: Decimal,
    pub vat_total: Decimal,
    pub discount_total: Decimal,
    pub payed_amount: Decimal,
    pub shipping_method: Option<ShippingMethod>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_due_days: i32,
    pub courier: Option<String>,
    pub planned_shipping_date: Option<NaiveDate>,
    pub shipment_time: Option<String>,
    pub woo_customer_id: Option<i64>,
}

impl NewOrder {
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::compute(
            &self.items,
            self.shipping_cost,
            self.vat_total,
            self.surcharge_amount,
            self.discount_total,
        )
    }
}

/// Replacement line items plus optional overrides for the other total terms.
///
/// Terms left as `None` keep the order's current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemsUpdate {
    pub items: Vec<OrderItem>,
    pub shipping_cost: Option<Decimal>,
    pub surcharge_amount: Option<Decimal>,
    pub discount_total: Option<Decimal>,
    pub note: Option<String>,
    /// Customer-facing change lines appended to `history_for_user`.
    pub history_for_user: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub date_created: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub billing_emails: Vec<String>,
    pub notify_emails: Vec<String>,
    pub note: String,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub deny_invoice: bool,
    pub need_vat: bool,
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub payed_amount: Decimal,
    pub shipping_method: Option<ShippingMethod>,
    pub payment_method: Option<PaymentMethod>,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_due_days: i32,
    pub courier: Option<String>,
    pub planned_shipping_date: Option<NaiveDate>,
    pub shipment_time: Option<String>,
    pub history: OrderHistory,
    pub shipment_id: Option<i64>,
    pub history_for_user: String,
    pub woo_customer_id: Option<i64>,
}

impl Order {
    /// Set the order status and record it in the history.
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        note: Option<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) {
        self.order_status = status;
        self.record(HistoryStatus::Order(status), note, actor, at);
    }

    /// Set the payment status and record it in the history.
    pub fn set_payment_status(
        &mut self,
        status: PaymentStatus,
        note: Option<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) {
        self.payment_status = status;
        self.record(HistoryStatus::Payment(status), note, actor, at);
    }

    /// Replace the line items, recompute subtotal and total, and record the
    /// edit under the current order status.
    pub fn replace_items(&mut self, update: ItemsUpdate, actor: &Actor, at: DateTime<Utc>) {
        let ItemsUpdate {
            items,
            shipping_cost,
            surcharge_amount,
            discount_total,
            note,
            history_for_user,
        } = update;

        self.totals = OrderTotals::compute(
            &items,
            shipping_cost.unwrap_or(self.totals.shipping_cost),
            self.totals.vat_total,
            surcharge_amount.unwrap_or(self.totals.surcharge_amount),
            discount_total.unwrap_or(self.totals.discount_total),
        );
        self.items = items;

        if !history_for_user.is_empty() {
            let lines = history_for_user.join("\n");
            if self.history_for_user.is_empty() {
                self.history_for_user = lines;
            } else {
                self.history_for_user = format!("{}\n{lines}", self.history_for_user);
            }
        }

        let note = note.or_else(|| Some("Rendelés tételek frissítve".to_string()));
        self.record(HistoryStatus::Order(self.order_status), note, actor, at);
    }

    fn record(
        &mut self,
        status: HistoryStatus,
        note: Option<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) {
        self.history.push(HistoryEntry {
            timestamp: at,
            status,
            note,
            user_id: actor.user_id.clone(),
            user_name: actor.user_name.clone(),
        });
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(id: &str, subtotal: Decimal) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            product_id: id.parse().ok(),
            name: format!("termék {id}"),
            size: None,
            unit: Some("db".to_string()),
            quantity: dec!(1),
            net_price: subtotal,
            gross_price: subtotal,
            vat_percent: None,
            subtotal,
            note: None,
            custom: false,
            cover_url: None,
        }
    }

    fn order(items: Vec<OrderItem>) -> Order {
        let now = Utc::now();
        Order {
            id: "1001".to_string(),
            date_created: now,
            updated_at: now,
            customer_id: None,
            customer_name: "Kiss Anna".to_string(),
            billing_emails: vec![],
            notify_emails: vec![],
            note: String::new(),
            shipping_address: None,
            billing_address: None,
            deny_invoice: false,
            need_vat: true,
            totals: OrderTotals::compute(&items, dec!(990), dec!(270), dec!(0), dec!(100)),
            items,
            payed_amount: dec!(0),
            shipping_method: None,
            payment_method: None,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_due_days: 0,
            courier: None,
            planned_shipping_date: None,
            shipment_time: None,
            history: OrderHistory::created(now),
            shipment_id: None,
            history_for_user: String::new(),
            woo_customer_id: None,
        }
    }

    #[test]
    fn totals_sum_items_shipping_vat_minus_discount() {
        let items = vec![item("1", dec!(1500)), item("2", dec!(2500))];
        let totals = OrderTotals::compute(&items, dec!(990), dec!(270), dec!(0), dec!(100));
        assert_eq!(totals.subtotal, dec!(4000));
        assert_eq!(totals.total, dec!(4000) + dec!(990) + dec!(270) - dec!(100));
    }

    #[test]
    fn surcharge_is_added_to_total() {
        let totals = OrderTotals::compute(&[item("1", dec!(100))], dec!(0), dec!(0), dec!(50), dec!(0));
        assert_eq!(totals.total, dec!(150));
    }

    #[test]
    fn new_order_totals_are_derived_from_items() {
        let new = NewOrder {
            items: vec![item("1", dec!(1200)), item("2", dec!(800))],
            shipping_cost: dec!(500),
            ..NewOrder::default()
        };
        let totals = new.totals();
        assert_eq!(totals.subtotal, dec!(2000));
        assert_eq!(totals.total, dec!(2500));
    }

    #[test]
    fn created_history_has_single_pending_entry() {
        let history = OrderHistory::created(Utc::now());
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.entries()[0].status,
            HistoryStatus::Order(OrderStatus::Pending)
        );
    }

    #[test]
    fn status_changes_append_and_keep_prior_entries() {
        let mut o = order(vec![item("1", dec!(1000))]);
        let first = o.history.entries()[0].clone();
        let actor = Actor {
            user_id: Some("u1".to_string()),
            user_name: Some("Admin".to_string()),
        };

        o.set_status(OrderStatus::Confirmed, None, &actor, Utc::now());
        o.set_payment_status(PaymentStatus::Paid, Some("SimplePay".to_string()), &actor, Utc::now());

        assert_eq!(o.order_status, OrderStatus::Confirmed);
        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert_eq!(o.history.len(), 3);
        assert_eq!(o.history.entries()[0], first);
        assert_eq!(
            o.history.last().map(|e| e.status),
            Some(HistoryStatus::Payment(PaymentStatus::Paid))
        );
        assert_eq!(
            o.history.last().and_then(|e| e.user_name.clone()),
            Some("Admin".to_string())
        );
    }

    #[test]
    fn replacing_items_recomputes_totals_and_keeps_other_terms() {
        let mut o = order(vec![item("1", dec!(1000))]);
        let before = o.history.len();
        o.replace_items(
            ItemsUpdate {
                items: vec![item("1", dec!(1000)), item("2", dec!(3000))],
                discount_total: Some(dec!(0)),
                history_for_user: vec!["+1 termék 2".to_string()],
                ..ItemsUpdate::default()
            },
            &Actor::default(),
            Utc::now(),
        );
        assert_eq!(o.totals.subtotal, dec!(4000));
        assert_eq!(o.totals.shipping_cost, dec!(990));
        assert_eq!(o.totals.total, dec!(4000) + dec!(990) + dec!(270));
        assert_eq!(o.history.len(), before + 1);
        assert_eq!(
            o.history.last().map(|e| e.status),
            Some(HistoryStatus::Order(OrderStatus::Pending))
        );
        assert_eq!(o.history_for_user, "+1 termék 2");
    }

    fn entry(status: HistoryStatus) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            status,
            note: None,
            user_id: None,
            user_name: None,
        }
    }

    #[test]
    fn history_status_round_trips_as_bare_string() {
        let json = serde_json::to_value(entry(HistoryStatus::Payment(PaymentStatus::PartiallyPaid)))
            .unwrap();
        assert_eq!(json["status"], "partially_paid");
        assert_eq!(json["kind"], "payment");
        let back: HistoryEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, HistoryStatus::Payment(PaymentStatus::PartiallyPaid));
    }

    #[test]
    fn shared_status_names_keep_their_kind() {
        for status in [
            HistoryStatus::Payment(PaymentStatus::Refunded),
            HistoryStatus::Payment(PaymentStatus::Pending),
            HistoryStatus::Order(OrderStatus::Refunded),
        ] {
            let json = serde_json::to_value(entry(status)).unwrap();
            let back: HistoryEntry = serde_json::from_value(json).unwrap();
            assert_eq!(back.status, status);
        }
    }

    #[test]
    fn entries_without_kind_resolve_order_side_first() {
        let legacy = serde_json::json!({
            "timestamp": "2026-03-01T10:00:00Z",
            "status": "refunded",
        });
        let back: HistoryEntry = serde_json::from_value(legacy).unwrap();
        assert_eq!(back.status, HistoryStatus::Order(OrderStatus::Refunded));

        let paid = serde_json::json!({ "timestamp": "2026-03-01T10:00:00Z", "status": "paid" });
        let back: HistoryEntry = serde_json::from_value(paid).unwrap();
        assert_eq!(back.status, HistoryStatus::Payment(PaymentStatus::Paid));
    }

    #[test]
    fn mismatched_kind_is_rejected() {
        let bad = serde_json::json!({
            "timestamp": "2026-03-01T10:00:00Z",
            "status": "confirmed",
            "kind": "payment",
        });
        assert!(serde_json::from_value::<HistoryEntry>(bad).is_err());
    }

    fn stocked(id: i64, stock: Option<Decimal>, backorder: bool) -> (i64, Product) {
        let product = Product {
            id,
            name: format!("termék {id}"),
            slug: format!("termek-{id}"),
            sku: None,
            unit: Some("db".to_string()),
            size: None,
            bio: false,
            net_price: dec!(1000),
            net_price_vip: dec!(1000),
            net_price_company: dec!(1000),
            gross_price: dec!(1270),
            vat_percent: dec!(27),
            stock,
            backorder,
            product_type: crate::ProductType::Simple,
            producer_id: None,
            featured_image: None,
            enabled: true,
            woo_id: None,
            updated_at: None,
        };
        (id, product)
    }

    fn qty(mut line: OrderItem, quantity: Decimal) -> OrderItem {
        line.quantity = quantity;
        line
    }

    #[test]
    fn untracked_product_accepts_any_quantity_without_backorder() {
        let products = HashMap::from([stocked(1, None, false)]);
        let items = vec![qty(item("1", dec!(1000)), dec!(500))];
        assert!(check_availability(&items, &products).is_ok());
    }

    #[test]
    fn tracked_product_rejects_quantity_above_stock() {
        let products = HashMap::from([stocked(1, Some(dec!(3)), false)]);
        let items = vec![qty(item("1", dec!(1000)), dec!(50))];
        assert!(matches!(
            check_availability(&items, &products),
            Err(CoreError::Unavailable { product_id: 1, requested, stock, .. })
                if requested == dec!(50) && stock == dec!(3)
        ));
    }

    #[test]
    fn backorder_allows_quantity_above_stock() {
        let products = HashMap::from([stocked(1, Some(dec!(0)), true)]);
        let items = vec![qty(item("1", dec!(1000)), dec!(5))];
        assert!(check_availability(&items, &products).is_ok());
    }

    #[test]
    fn quantities_of_repeated_lines_are_summed() {
        let products = HashMap::from([stocked(1, Some(dec!(3)), false)]);
        let items = vec![
            qty(item("1", dec!(1000)), dec!(2)),
            qty(item("1", dec!(1000)), dec!(2)),
        ];
        assert!(check_availability(&items, &products).is_err());
    }

    #[test]
    fn custom_and_unknown_lines_are_not_checked() {
        let products = HashMap::from([stocked(1, Some(dec!(0)), false)]);
        let mut custom = qty(item("1", dec!(1000)), dec!(9));
        custom.custom = true;
        let unknown = qty(item("77", dec!(1000)), dec!(9));
        assert!(check_availability(&[custom, unknown], &products).is_ok());
    }

    #[test]
    fn active_statuses_exclude_cancelled_and_refunded() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::Delivered.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
        assert!(!OrderStatus::Refunded.is_active());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            "lost".parse::<OrderStatus>(),
            Err(CoreError::InvalidOrderStatus(ref s)) if s == "lost"
        ));
        assert_eq!(
            "partially_paid".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::PartiallyPaid
        );
    }

    #[test]
    fn full_address_skips_missing_parts() {
        let addr = Address {
            name: "Kiss Anna".to_string(),
            postcode: Some("1111".to_string()),
            city: Some("Budapest".to_string()),
            street: Some("Fő utca".to_string()),
            house_number: Some("1".to_string()),
            ..Address::default()
        };
        assert_eq!(addr.full_address(), "1111 Budapest Fő utca 1");
    }
}
