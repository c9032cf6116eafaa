//! Orders pass: insert missing WooCommerce orders and batch them into shipments.

use std::collections::HashMap;

use f2f_woo::{normalize_order, Change, ProgressFn, SyncReport, WooOrder};

use super::ImportContext;

/// Orders already stored are never touched again; new ones are inserted with
/// their WooCommerce totals and attached to the shipment of their planned date.
pub(super) async fn sync_orders(
    ctx: &ImportContext<'_>,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<SyncReport> {
    let woo = ctx.client.fetch_orders().await?;
    let product_ids: HashMap<i64, i64> = f2f_db::list_products(ctx.pool)
        .await?
        .into_iter()
        .filter_map(|p| p.woo_id.map(|woo_id| (woo_id, p.id)))
        .collect();

    let mut report = SyncReport::default();
    let total = woo.len();
    for (processed, raw) in woo.iter().enumerate() {
        let label = raw.id.to_string();
        progress(processed, total, &label);
        match import_order(ctx, raw, &product_ids).await {
            Ok(change) => report.record("order", &label, &change),
            Err(e) => {
                tracing::warn!(woo_id = raw.id, error = %format!("{e:#}"), "skipping order");
                report.record_error(&label, format!("{e:#}"));
            }
        }
    }
    progress(total, total, "");

    Ok(report)
}

async fn import_order(
    ctx: &ImportContext<'_>,
    raw: &WooOrder,
    product_ids: &HashMap<i64, i64>,
) -> anyhow::Result<Change> {
    if f2f_db::order_exists(ctx.pool, &raw.id.to_string()).await? {
        return Ok(Change::Unchanged(raw.id));
    }
    let order = normalize_order(raw, product_ids)?;
    if ctx.dry_run {
        return Ok(Change::Create);
    }
    if !f2f_db::insert_imported_order(ctx.pool, &order).await? {
        return Ok(Change::Unchanged(raw.id));
    }

    if order.planned_shipping_date.is_some() {
        let shipment = f2f_db::ensure_order_in_shipment(ctx.pool, &order.id)
            .await
            .map_err(|e| anyhow::anyhow!("order stored but not batched: {e}"))?;
        tracing::debug!(
            order_id = %order.id,
            shipment_id = shipment.id,
            date = %shipment.date,
            "imported order batched"
        );
    }
    Ok(Change::Create)
}
