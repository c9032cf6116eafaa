//! Live integration tests for f2f-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL` pointing at a server the
//! harness may create databases on, so they are ignored by default:
//! `cargo test -p f2f-db -- --ignored`.

use chrono::NaiveDate;
use f2f_core::{
    Actor, EmailTemplate, EmailTrigger, ItemsUpdate, NewOrder, OrderItem, OrderStatus,
    PaymentStatus, ProductType, ROOT_CATEGORY_ID,
};
use f2f_db::{
    assign_order_to_shipment, bundle_items_for, create_import_run, create_order,
    ensure_order_in_shipment, get_email_template, get_order, get_shipment, insert_category,
    insert_imported_order, insert_product, list_orders_for_shipment, record_import_entity, refresh_shipment_counts,
    remove_order_from_shipment, replace_bundle_items, seed_email_templates, set_category_parent,
    start_import_run, update_order_items, update_order_status, update_payment_status,
    upsert_email_template, CategoryWrite, DbError, ProductWrite,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn line(product_id: i64, qty: Decimal, net: Decimal) -> OrderItem {
    OrderItem {
        id: product_id.to_string(),
        product_id: Some(product_id),
        name: format!("Termék {product_id}"),
        size: None,
        unit: Some("db".to_string()),
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

fn new_order(customer: &str, planned: Option<NaiveDate>, items: Vec<OrderItem>) -> NewOrder {
    NewOrder {
        customer_name: customer.to_string(),
        billing_emails: vec![format!("{}@example.hu", customer.to_lowercase())],
        items,
        shipping_cost: dec!(990),
        planned_shipping_date: planned,
        ..NewOrder::default()
    }
}

fn product_write(slug: &str, product_type: ProductType) -> ProductWrite {
    ProductWrite {
        name: slug.to_string(),
        slug: slug.to_string(),
        sku: None,
        unit: Some("db".to_string()),
        size: None,
        bio: false,
        net_price: dec!(1000),
        net_price_vip: dec!(900),
        net_price_company: dec!(800),
        gross_price: dec!(1270),
        vat_percent: dec!(27),
        stock: None,
        backorder: false,
        product_type,
        producer_id: None,
        featured_image: None,
        enabled: true,
        woo_id: None,
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_order_derives_totals_and_seeds_history(pool: sqlx::PgPool) {
    let order = create_order(
        &pool,
        &new_order("Anna", None, vec![line(1, dec!(2), dec!(500)), line(2, dec!(1), dec!(1500))]),
    )
    .await
    .expect("create_order failed");

    assert_eq!(order.totals.subtotal, dec!(2500));
    assert_eq!(order.totals.total, dec!(3490));
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.history.len(), 1);

    let second = create_order(&pool, &new_order("Béla", None, vec![]))
        .await
        .expect("second create_order failed");
    assert_ne!(order.id, second.id);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn order_numbers_come_from_the_sequence_and_skip_imported_ids(pool: sqlx::PgPool) {
    let first = create_order(&pool, &new_order("Anna", None, vec![]))
        .await
        .expect("create_order failed");
    let first_number: i64 = first.id.parse().expect("numeric order id");
    assert!(first_number >= 1000);

    let mut imported = first.clone();
    imported.id = "5000".to_string();
    assert!(insert_imported_order(&pool, &imported).await.expect("import"));
    assert!(!insert_imported_order(&pool, &imported).await.expect("re-import"));

    let next = create_order(&pool, &new_order("Béla", None, vec![]))
        .await
        .expect("create after import");
    let next_number: i64 = next.id.parse().expect("numeric order id");
    assert!(next_number > 5000, "sequence moved past the imported id, got {next_number}");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn orders_beyond_available_stock_are_rejected(pool: sqlx::PgPool) {
    let limited = insert_product(
        &pool,
        &ProductWrite {
            stock: Some(dec!(3)),
            ..product_write("tojas", ProductType::Simple)
        },
    )
    .await
    .expect("insert limited");
    let backordered = insert_product(
        &pool,
        &ProductWrite {
            stock: Some(dec!(0)),
            backorder: true,
            ..product_write("mez", ProductType::Simple)
        },
    )
    .await
    .expect("insert backordered");
    let untracked = insert_product(&pool, &product_write("alma", ProductType::Simple))
        .await
        .expect("insert untracked");

    let err = create_order(
        &pool,
        &new_order(
            "Anna",
            None,
            vec![line(limited, dec!(2), dec!(100)), line(limited, dec!(2), dec!(100))],
        ),
    )
    .await
    .expect_err("four eggs out of three");
    assert!(matches!(
        err,
        DbError::Domain(f2f_core::CoreError::Unavailable { product_id, .. }) if product_id == limited
    ));

    let order = create_order(
        &pool,
        &new_order(
            "Anna",
            None,
            vec![
                line(limited, dec!(3), dec!(100)),
                line(backordered, dec!(10), dec!(100)),
                line(untracked, dec!(50), dec!(100)),
            ],
        ),
    )
    .await
    .expect("within stock");

    let update = ItemsUpdate {
        items: vec![line(limited, dec!(4), dec!(100))],
        ..ItemsUpdate::default()
    };
    let err = update_order_items(&pool, &order.id, update, &Actor::default())
        .await
        .expect_err("update beyond stock");
    assert!(matches!(err, DbError::Domain(_)));

    let stored = get_order(&pool, &order.id).await.expect("get_order");
    assert_eq!(stored.items.len(), 3);
    assert_eq!(stored.history.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn status_and_item_updates_append_history(pool: sqlx::PgPool) {
    let order = create_order(&pool, &new_order("Anna", None, vec![line(1, dec!(1), dec!(1000))]))
        .await
        .expect("create_order failed");
    let actor = Actor {
        user_id: Some("admin-1".to_string()),
        user_name: Some("Admin".to_string()),
    };

    update_order_status(&pool, &order.id, OrderStatus::Confirmed, None, &actor)
        .await
        .expect("update_order_status failed");
    update_payment_status(&pool, &order.id, PaymentStatus::Paid, None, &actor)
        .await
        .expect("update_payment_status failed");
    let updated = update_order_items(
        &pool,
        &order.id,
        ItemsUpdate {
            items: vec![line(1, dec!(3), dec!(1000))],
            ..ItemsUpdate::default()
        },
        &actor,
    )
    .await
    .expect("update_order_items failed");

    assert_eq!(updated.totals.subtotal, dec!(3000));
    assert_eq!(updated.totals.total, dec!(3990));

    let stored = get_order(&pool, &order.id).await.expect("get_order failed");
    assert_eq!(stored.history.len(), 4);
    assert_eq!(stored.history.entries()[0], order.history.entries()[0]);
    assert_eq!(stored.order_status, OrderStatus::Confirmed);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

// ---------------------------------------------------------------------------
// Shipments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn orders_with_same_planned_date_share_a_shipment(pool: sqlx::PgPool) {
    let day = date(2026, 11, 3);
    let a = create_order(&pool, &new_order("Anna", Some(day), vec![line(1, dec!(2), dec!(500))]))
        .await
        .expect("create a");
    let b = create_order(&pool, &new_order("Béla", Some(day), vec![line(2, dec!(1), dec!(700))]))
        .await
        .expect("create b");

    let first = ensure_order_in_shipment(&pool, &a.id).await.expect("ensure a");
    let second = ensure_order_in_shipment(&pool, &b.id).await.expect("ensure b");

    assert_eq!(first.id, second.id);
    assert_eq!(second.date, day);
    assert_eq!(second.order_count, 2);
    assert_eq!(second.product_count, 2);
    assert_eq!(second.product_amount, dec!(1700));

    let again = ensure_order_in_shipment(&pool, &a.id).await.expect("ensure a again");
    assert_eq!(again.id, first.id);
    assert_eq!(again.order_count, 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_attachments_do_not_lose_counts(pool: sqlx::PgPool) {
    let day = date(2026, 11, 4);
    let mut ids = Vec::new();
    for i in 0..8 {
        let order = create_order(
            &pool,
            &new_order(&format!("Vevő{i}"), Some(day), vec![line(i, dec!(1), dec!(100))]),
        )
        .await
        .expect("create order");
        ids.push(order.id);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let pool = pool.clone();
            let id = id.clone();
            tokio::spawn(async move { ensure_order_in_shipment(&pool, &id).await })
        })
        .collect();

    let mut shipment_ids = Vec::new();
    for handle in handles {
        let shipment = handle.await.expect("join").expect("ensure");
        shipment_ids.push(shipment.id);
    }
    shipment_ids.dedup();
    assert_eq!(shipment_ids.len(), 1);

    let shipment = get_shipment(&pool, shipment_ids[0]).await.expect("get_shipment");
    assert_eq!(shipment.order_count, 8);
    assert_eq!(shipment.product_count, 8);
    assert_eq!(shipment.product_amount, dec!(800));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn ensure_without_planned_date_is_an_error(pool: sqlx::PgPool) {
    let order = create_order(&pool, &new_order("Anna", None, vec![]))
        .await
        .expect("create_order failed");

    let err = ensure_order_in_shipment(&pool, &order.id).await.unwrap_err();
    assert!(matches!(err, DbError::NoPlannedDate(ref id) if *id == order.id));

    let missing = ensure_order_in_shipment(&pool, "no-such-order").await.unwrap_err();
    assert!(matches!(missing, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn moving_an_order_updates_both_shipments(pool: sqlx::PgPool) {
    let monday = date(2026, 11, 9);
    let tuesday = date(2026, 11, 10);
    let a = create_order(&pool, &new_order("Anna", Some(monday), vec![line(1, dec!(1), dec!(500))]))
        .await
        .expect("create a");
    let b = create_order(&pool, &new_order("Béla", Some(tuesday), vec![line(2, dec!(1), dec!(700))]))
        .await
        .expect("create b");
    let first = ensure_order_in_shipment(&pool, &a.id).await.expect("ensure a");
    let second = ensure_order_in_shipment(&pool, &b.id).await.expect("ensure b");

    let target = assign_order_to_shipment(&pool, &a.id, second.id)
        .await
        .expect("assign");
    assert_eq!(target.order_count, 2);

    let moved = get_order(&pool, &a.id).await.expect("get a");
    assert_eq!(moved.shipment_id, Some(second.id));
    assert_eq!(moved.planned_shipping_date, Some(tuesday));

    let left = get_shipment(&pool, first.id).await.expect("get first");
    assert_eq!(left.order_count, 0);
    assert_eq!(left.product_amount, Decimal::ZERO);

    let after_removal = remove_order_from_shipment(&pool, &a.id)
        .await
        .expect("remove")
        .expect("was in a shipment");
    assert_eq!(after_removal.order_count, 1);
    assert!(remove_order_from_shipment(&pool, &a.id)
        .await
        .expect("second remove")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cancelled_orders_drop_out_of_counters(pool: sqlx::PgPool) {
    let day = date(2026, 11, 5);
    let a = create_order(&pool, &new_order("Anna", Some(day), vec![line(1, dec!(1), dec!(500))]))
        .await
        .expect("create a");
    let b = create_order(&pool, &new_order("Béla", Some(day), vec![line(2, dec!(1), dec!(700))]))
        .await
        .expect("create b");
    ensure_order_in_shipment(&pool, &a.id).await.expect("ensure a");
    let shipment = ensure_order_in_shipment(&pool, &b.id).await.expect("ensure b");

    update_order_status(&pool, &b.id, OrderStatus::Cancelled, None, &Actor::default())
        .await
        .expect("cancel b");

    let after_cancel = get_shipment(&pool, shipment.id).await.expect("get_shipment");
    assert_eq!(after_cancel.order_count, 1, "counters follow the status change");
    assert_eq!(after_cancel.product_amount, dec!(500));

    let update = ItemsUpdate {
        items: vec![line(1, dec!(3), dec!(500))],
        ..ItemsUpdate::default()
    };
    update_order_items(&pool, &a.id, update, &Actor::default())
        .await
        .expect("update a");
    let after_items = get_shipment(&pool, shipment.id).await.expect("get_shipment");
    assert_eq!(after_items.product_amount, dec!(1500));

    let refreshed = refresh_shipment_counts(&pool, shipment.id).await.expect("refresh");
    assert_eq!(refreshed.order_count, 1);
    assert_eq!(refreshed.product_amount, dec!(1500));

    let members = list_orders_for_shipment(&pool, shipment.id).await.expect("members");
    assert_eq!(members.len(), 2);
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn root_category_rejects_parent(pool: sqlx::PgPool) {
    let child = insert_category(
        &pool,
        &CategoryWrite {
            name: "Zöldség".to_string(),
            slug: "zoldseg".to_string(),
            description: None,
            cover_url: None,
            sort_order: 1,
            enabled: true,
            woo_id: None,
        },
    )
    .await
    .expect("insert_category failed");

    let err = set_category_parent(&pool, ROOT_CATEGORY_ID, Some(child))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(_)));

    set_category_parent(&pool, child, Some(ROOT_CATEGORY_ID))
        .await
        .expect("child under root");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn replacing_bundle_items_discards_previous_rows(pool: sqlx::PgPool) {
    let bundle = insert_product(&pool, &product_write("doboz", ProductType::Bundle))
        .await
        .expect("bundle");
    let carrot = insert_product(&pool, &product_write("repa", ProductType::Simple))
        .await
        .expect("carrot");
    let potato = insert_product(&pool, &product_write("krumpli", ProductType::Simple))
        .await
        .expect("potato");

    replace_bundle_items(&pool, bundle, &[(carrot, dec!(2)), (potato, dec!(1))])
        .await
        .expect("first replace");
    replace_bundle_items(&pool, bundle, &[(potato, dec!(3))])
        .await
        .expect("second replace");

    let map = bundle_items_for(&pool, &[bundle]).await.expect("bundle_items_for");
    let items = map.get(&bundle).expect("bundle present");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, potato);
    assert_eq!(items[0].qty, dec!(3));
}

// ---------------------------------------------------------------------------
// Email templates and import runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn seeding_keeps_edited_templates(pool: sqlx::PgPool) {
    upsert_email_template(
        &pool,
        &EmailTemplate {
            trigger: EmailTrigger::OrderPlaced,
            subject: "Edited".to_string(),
            body: "<p>edited</p>".to_string(),
            enabled: false,
        },
    )
    .await
    .expect("upsert");

    let seeds = vec![
        EmailTemplate {
            trigger: EmailTrigger::OrderPlaced,
            subject: "Seed".to_string(),
            body: "<p>seed</p>".to_string(),
            enabled: true,
        },
        EmailTemplate {
            trigger: EmailTrigger::Registration,
            subject: "Welcome".to_string(),
            body: "<p>hi {{name}}</p>".to_string(),
            enabled: true,
        },
    ];
    let inserted = seed_email_templates(&pool, &seeds).await.expect("seed");
    assert_eq!(inserted, 1);

    let stored = get_email_template(&pool, EmailTrigger::OrderPlaced)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stored.subject, "Edited");
    assert!(!stored.enabled);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn import_run_records_entity_outcomes(pool: sqlx::PgPool) {
    let run = create_import_run(&pool, "cli", false).await.expect("create");
    assert_eq!(run.status, "queued");
    start_import_run(&pool, run.id).await.expect("start");

    record_import_entity(&pool, run.id, "categories", 3, 1, &["Created new category: Gyümölcs".to_string()])
        .await
        .expect("record");
    record_import_entity(&pool, run.id, "categories", 4, 0, &[])
        .await
        .expect("overwrite");

    let entities = f2f_db::list_import_run_entities(&pool, run.id)
        .await
        .expect("list");
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].success, 4);
    assert!(entities[0].details.0.is_empty());

    let err = start_import_run(&pool, run.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidImportRunTransition { expected_status: "queued", .. }
    ));
}
