use chrono::Utc;
use rust_decimal_macros::dec;

use super::*;
use crate::catalog::ProductType;
use crate::orders::{OrderHistory, OrderItem, OrderStatus, OrderTotals, PaymentStatus};

fn line(product_id: i64, name: &str, unit: &str, qty: Decimal, net: Decimal) -> OrderItem {
    OrderItem {
        id: product_id.to_string(),
        product_id: Some(product_id),
        name: name.to_string(),
        size: None,
        unit: Some(unit.to_string()),
        quantity: qty,
        net_price: net,
        gross_price: net,
        vat_percent: None,
        subtotal: qty * net,
        note: None,
        custom: false,
        cover_url: None,
    }
}

fn order(id: &str, customer: &str, status: OrderStatus, items: Vec<OrderItem>) -> Order {
    let now = Utc::now();
    Order {
        id: id.to_string(),
        date_created: now,
        updated_at: now,
        customer_id: None,
        customer_name: customer.to_string(),
        billing_emails: vec![],
        notify_emails: vec![],
        note: String::new(),
        shipping_address: None,
        billing_address: None,
        deny_invoice: false,
        need_vat: false,
        totals: OrderTotals::compute(&items, dec!(500), dec!(0), dec!(0), dec!(0)),
        items,
        payed_amount: dec!(0),
        shipping_method: None,
        payment_method: None,
        order_status: status,
        payment_status: PaymentStatus::Pending,
        payment_due_days: 0,
        courier: None,
        planned_shipping_date: None,
        shipment_time: None,
        history: OrderHistory::created(now),
        shipment_id: Some(1),
        history_for_user: String::new(),
        woo_customer_id: None,
    }
}

fn product(id: i64, name: &str, product_type: ProductType, bio: bool) -> Product {
    Product {
        id,
        name: name.to_string(),
        slug: name.to_lowercase(),
        sku: None,
        unit: Some("db".to_string()),
        size: None,
        bio,
        net_price: dec!(0),
        net_price_vip: dec!(0),
        net_price_company: dec!(0),
        gross_price: dec!(0),
        vat_percent: dec!(27),
        stock: None,
        backorder: false,
        product_type,
        producer_id: None,
        featured_image: None,
        enabled: true,
        woo_id: None,
        updated_at: None,
    }
}

#[test]
fn counters_ignore_cancelled_and_refunded_orders() {
    let orders = vec![
        order(
            "1",
            "Anna",
            OrderStatus::Pending,
            vec![line(10, "Alma", "kg", dec!(2), dec!(500))],
        ),
        order(
            "2",
            "Béla",
            OrderStatus::Confirmed,
            vec![
                line(10, "Alma", "kg", dec!(1), dec!(500)),
                line(11, "Körte", "kg", dec!(1), dec!(700)),
            ],
        ),
        order(
            "3",
            "Cili",
            OrderStatus::Cancelled,
            vec![line(12, "Szilva", "kg", dec!(5), dec!(400))],
        ),
        order(
            "4",
            "Dani",
            OrderStatus::Refunded,
            vec![line(10, "Alma", "kg", dec!(9), dec!(500))],
        ),
    ];

    let counters = shipment_counters(&orders);
    assert_eq!(counters.order_count, 2);
    assert_eq!(counters.product_count, 2);
    assert_eq!(counters.product_amount, dec!(2200));
}

#[test]
fn counters_of_empty_shipment_are_zero() {
    assert_eq!(shipment_counters(&[]), ShipmentCounters::default());
}

#[test]
fn summary_groups_by_name_size_unit_and_averages_prices() {
    let orders = vec![
        order(
            "1",
            "Anna",
            OrderStatus::Pending,
            vec![line(10, "Alma", "kg", dec!(2), dec!(400))],
        ),
        order(
            "2",
            "Béla",
            OrderStatus::Pending,
            vec![
                line(10, "Alma", "kg", dec!(3), dec!(600)),
                line(10, "Alma", "láda", dec!(1), dec!(5000)),
            ],
        ),
    ];

    let summary = summarize_shipment_items(&orders, &HashMap::new(), &HashMap::new());
    assert_eq!(summary.items.len(), 2);

    let kg = summary
        .items
        .iter()
        .find(|i| i.id == "Alma--kg")
        .expect("kg group");
    assert_eq!(kg.total_quantity, dec!(5));
    assert_eq!(kg.average_price, dec!(500));
    assert_eq!(kg.total_value, dec!(2500));
    assert_eq!(kg.order_count, 2);
    assert_eq!(kg.customers, vec!["Anna".to_string(), "Béla".to_string()]);
}

#[test]
fn summary_sorts_by_total_value_descending() {
    let orders = vec![order(
        "1",
        "Anna",
        OrderStatus::Pending,
        vec![
            line(1, "Tojás", "db", dec!(10), dec!(80)),
            line(2, "Sajt", "kg", dec!(1), dec!(6000)),
            line(3, "Méz", "üveg", dec!(2), dec!(400)),
        ],
    )];

    let summary = summarize_shipment_items(&orders, &HashMap::new(), &HashMap::new());
    let names: Vec<&str> = summary.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Sajt", "Méz", "Tojás"]);
}

#[test]
fn summary_expands_bundle_children_after_parent() {
    let orders = vec![
        order(
            "1",
            "Anna",
            OrderStatus::Pending,
            vec![line(100, "Zöldségdoboz", "db", dec!(2), dec!(8000))],
        ),
        order(
            "2",
            "Béla",
            OrderStatus::Pending,
            vec![
                line(100, "Zöldségdoboz", "db", dec!(1), dec!(8000)),
                line(1, "Tojás", "db", dec!(10), dec!(80)),
            ],
        ),
    ];

    let mut products = HashMap::new();
    products.insert(100, product(100, "Zöldségdoboz", ProductType::Bundle, false));
    products.insert(5, product(5, "Répa", ProductType::Simple, true));
    products.insert(6, product(6, "Burgonya", ProductType::Simple, false));

    let mut bundles = HashMap::new();
    bundles.insert(
        100,
        vec![
            BundleItem {
                box_id: 100,
                product_id: 5,
                qty: dec!(2),
            },
            BundleItem {
                box_id: 100,
                product_id: 6,
                qty: dec!(1.5),
            },
        ],
    );

    let summary = summarize_shipment_items(&orders, &products, &bundles);
    assert_eq!(summary.items.len(), 4);

    let parent = &summary.items[0];
    assert_eq!(parent.name, "Zöldségdoboz");
    assert_eq!(parent.total_quantity, dec!(3));
    assert!(!parent.is_bundle_item);

    let carrot = &summary.items[1];
    assert!(carrot.is_bundle_item);
    assert_eq!(carrot.id, "Zöldségdoboz--db-bundle-5");
    assert_eq!(carrot.name, "Répa");
    assert_eq!(carrot.total_quantity, dec!(6));
    assert_eq!(carrot.total_value, dec!(0));
    assert_eq!(carrot.parent_quantity, Some(dec!(3)));
    assert_eq!(carrot.individual_quantity, Some(dec!(2)));
    assert!(carrot.is_bio);

    let potato = &summary.items[2];
    assert_eq!(potato.total_quantity, dec!(4.5));

    assert_eq!(summary.items[3].name, "Tojás");
    assert_eq!(summary.product_count, 2);
    assert_eq!(summary.order_count, 2);
}

#[test]
fn summary_skips_inactive_orders_and_sums_order_totals() {
    let orders = vec![
        order(
            "1",
            "Anna",
            OrderStatus::Pending,
            vec![line(1, "Tojás", "db", dec!(10), dec!(80))],
        ),
        order(
            "2",
            "Béla",
            OrderStatus::Cancelled,
            vec![line(2, "Sajt", "kg", dec!(1), dec!(6000))],
        ),
    ];

    let summary = summarize_shipment_items(&orders, &HashMap::new(), &HashMap::new());
    assert_eq!(summary.order_count, 1);
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.product_amount, dec!(1300));
}

#[test]
fn missing_bundle_component_falls_back_to_placeholder() {
    let orders = vec![order(
        "1",
        "Anna",
        OrderStatus::Pending,
        vec![line(100, "Doboz", "db", dec!(1), dec!(5000))],
    )];
    let mut products = HashMap::new();
    products.insert(100, product(100, "Doboz", ProductType::Bundle, false));
    let mut bundles = HashMap::new();
    bundles.insert(
        100,
        vec![BundleItem {
            box_id: 100,
            product_id: 999,
            qty: dec!(1),
        }],
    );

    let summary = summarize_shipment_items(&orders, &products, &bundles);
    assert_eq!(summary.items[1].name, "Unknown");
    assert_eq!(summary.items[1].unit.as_deref(), Some("db"));
}
