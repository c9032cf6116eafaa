//! Catalog passes: categories, producers and products.

use std::collections::HashMap;

use f2f_core::{Category, Producer, Product};
use f2f_db::{CategoryWrite, DbError, ProducerWrite, ProductWrite};
use f2f_woo::{
    match_stored, name_index, normalize_category, normalize_producer, normalize_product,
    plan_category, plan_category_parents, plan_producer, plan_product, woo_id_index, Change,
    ImageFolder, ProductDraft, ProgressFn, SyncReport,
};

use super::ImportContext;

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

async fn load_categories(pool: &sqlx::PgPool) -> Result<Vec<Category>, DbError> {
    Ok(f2f_db::list_categories(pool)
        .await?
        .into_iter()
        .map(Category::from)
        .collect())
}

async fn load_producers(pool: &sqlx::PgPool) -> Result<Vec<Producer>, DbError> {
    Ok(f2f_db::list_producers(pool)
        .await?
        .into_iter()
        .map(Producer::from)
        .collect())
}

async fn load_products(pool: &sqlx::PgPool) -> Result<Vec<Product>, DbError> {
    f2f_db::list_products(pool)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

/// Categories match by WooCommerce id, then by name. A second pass links
/// parents once every category exists.
pub(super) async fn sync_categories(
    ctx: &ImportContext<'_>,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<SyncReport> {
    let woo = ctx.client.fetch_categories().await?;
    let stored = load_categories(ctx.pool).await?;
    let mut report = SyncReport::default();
    let total = woo.len();

    {
        let by_woo = woo_id_index(&stored, |c| c.woo_id);
        let by_name = name_index(&stored, |c| c.name.as_str());
        for (processed, raw) in woo.iter().enumerate() {
            progress(processed, total, &raw.name);
            let draft = normalize_category(raw);
            let existing = match_stored(&by_woo, &by_name, draft.woo_id, &draft.name);
            let change = plan_category(existing, &draft);

            if ctx.dry_run || matches!(change, Change::Unchanged(_)) {
                report.record("category", &draft.name, &change);
                continue;
            }

            let cover_url = ctx
                .reupload_image(
                    &mut report,
                    &draft.name,
                    draft.woo_id,
                    draft.image_src.as_deref(),
                    ImageFolder::Category,
                )
                .await;
            let write = CategoryWrite {
                name: draft.name.clone(),
                slug: draft.slug.clone(),
                description: Some(draft.description.clone()).filter(|d| !d.is_empty()),
                cover_url: cover_url.or_else(|| existing.and_then(|c| c.cover_url.clone())),
                sort_order: draft.order,
                enabled: existing.map_or(true, |c| c.enabled),
                woo_id: Some(draft.woo_id),
            };
            let written = match change {
                Change::Create => f2f_db::insert_category(ctx.pool, &write).await.map(|_| ()),
                Change::Update(id) => f2f_db::update_category(ctx.pool, id, &write).await,
                Change::Unchanged(_) => Ok(()),
            };
            match written {
                Ok(()) => report.record("category", &draft.name, &change),
                Err(e) => {
                    tracing::warn!(woo_id = draft.woo_id, error = %e, "skipping category");
                    report.record_error(&draft.name, e);
                }
            }
        }
    }
    progress(total, total, "parent links");

    let stored = if ctx.dry_run {
        stored
    } else {
        load_categories(ctx.pool).await?
    };
    for link in plan_category_parents(&woo, &stored) {
        if ctx.dry_run {
            report.parent_linked(&link.child_name, &link.parent_name);
            continue;
        }
        match f2f_db::set_category_parent(ctx.pool, link.child_id, Some(link.parent_id)).await {
            Ok(()) => report.parent_linked(&link.child_name, &link.parent_name),
            Err(e) => {
                tracing::warn!(category_id = link.child_id, error = %e, "parent link failed");
                report.parent_failed(&link.child_name, e);
            }
        }
    }

    Ok(report)
}

/// Producers match by WooCommerce id, then by name.
pub(super) async fn sync_producers(
    ctx: &ImportContext<'_>,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<SyncReport> {
    let woo = ctx.client.fetch_producers().await?;
    let stored = load_producers(ctx.pool).await?;
    let by_woo = woo_id_index(&stored, |p| p.woo_id);
    let by_name = name_index(&stored, |p| p.name.as_str());

    let mut report = SyncReport::default();
    let total = woo.len();
    for (processed, raw) in woo.iter().enumerate() {
        progress(processed, total, &raw.name);
        let draft = normalize_producer(raw);
        let existing = match_stored(&by_woo, &by_name, draft.woo_id, &draft.name);
        let change = plan_producer(existing, &draft);

        if ctx.dry_run || matches!(change, Change::Unchanged(_)) {
            report.record("producer", &draft.name, &change);
            continue;
        }

        let cover_url = ctx
            .reupload_image(
                &mut report,
                &draft.name,
                draft.woo_id,
                draft.image_src.as_deref(),
                ImageFolder::Assets,
            )
            .await;
        let write = ProducerWrite {
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            short_description: draft.short_description.clone(),
            description: draft.description.clone(),
            cover_url: cover_url.or_else(|| existing.and_then(|p| p.cover_url.clone())),
            bio: draft.bio,
            enabled: existing.map_or(true, |p| p.enabled),
            woo_id: Some(draft.woo_id),
        };
        let written = match change {
            Change::Create => f2f_db::insert_producer(ctx.pool, &write).await.map(|_| ()),
            Change::Update(id) => f2f_db::update_producer(ctx.pool, id, &write).await,
            Change::Unchanged(_) => Ok(()),
        };
        match written {
            Ok(()) => report.record("producer", &draft.name, &change),
            Err(e) => {
                tracing::warn!(woo_id = draft.woo_id, error = %e, "skipping producer");
                report.record_error(&draft.name, e);
            }
        }
    }
    progress(total, total, "");

    Ok(report)
}

/// Stored producer for a product: WooCommerce producer id first, then name.
fn resolve_producer(
    draft: &ProductDraft,
    by_woo: &HashMap<i64, &Producer>,
    by_name: &HashMap<String, &Producer>,
) -> Option<i64> {
    draft
        .woo_producer_id
        .and_then(|id| by_woo.get(&id))
        .or_else(|| draft.producer_name.as_deref().and_then(|n| by_name.get(&key(n))))
        .map(|p| p.id)
}

/// Products match by WooCommerce id, then by name. Producers and categories
/// must already be imported for the links to resolve.
pub(super) async fn sync_products(
    ctx: &ImportContext<'_>,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<SyncReport> {
    let woo = ctx.client.fetch_products().await?;
    let stored = load_products(ctx.pool).await?;
    let producers = load_producers(ctx.pool).await?;
    let categories = load_categories(ctx.pool).await?;

    let by_woo = woo_id_index(&stored, |p| p.woo_id);
    let by_name = name_index(&stored, |p| p.name.as_str());
    let producers_by_woo = woo_id_index(&producers, |p| p.woo_id);
    let producers_by_name = name_index(&producers, |p| p.name.as_str());
    let categories_by_name = name_index(&categories, |c| c.name.as_str());

    let mut report = SyncReport::default();
    let total = woo.len();
    for (processed, raw) in woo.iter().enumerate() {
        progress(processed, total, &raw.name);
        let draft = match normalize_product(raw) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(woo_id = raw.id, error = %e, "skipping product");
                report.record_error(raw.name.trim(), e);
                continue;
            }
        };
        let existing = match_stored(&by_woo, &by_name, draft.woo_id, &draft.name);
        let producer_id = resolve_producer(&draft, &producers_by_woo, &producers_by_name);
        let change = plan_product(existing, &draft, producer_id);

        if ctx.dry_run || matches!(change, Change::Unchanged(_)) {
            report.record("product", &draft.name, &change);
            continue;
        }

        let uploaded = ctx
            .reupload_image(
                &mut report,
                &draft.name,
                draft.woo_id,
                draft.image_src.as_deref(),
                ImageFolder::Product,
            )
            .await;
        let write = ProductWrite {
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            sku: draft.sku.clone(),
            unit: draft.unit.clone(),
            size: draft.size.clone(),
            bio: draft.bio,
            net_price: draft.net_price,
            net_price_vip: draft.net_price_vip,
            net_price_company: draft.net_price_company,
            gross_price: draft.gross_price,
            vat_percent: draft.vat_percent,
            stock: draft.stock,
            backorder: draft.backorder,
            product_type: draft.product_type,
            producer_id,
            featured_image: uploaded.or_else(|| existing.and_then(|p| p.featured_image.clone())),
            enabled: draft.enabled,
            woo_id: Some(draft.woo_id),
        };
        let category_ids: Vec<i64> = draft
            .category_names
            .iter()
            .filter_map(|name| categories_by_name.get(&key(name)).map(|c| c.id))
            .collect();

        match write_product(ctx.pool, change, &write, &category_ids).await {
            Ok(()) => report.record("product", &draft.name, &change),
            Err(e) => {
                tracing::warn!(woo_id = draft.woo_id, error = %e, "skipping product");
                report.record_error(&draft.name, e);
            }
        }
    }
    progress(total, total, "");

    Ok(report)
}

async fn write_product(
    pool: &sqlx::PgPool,
    change: Change,
    write: &ProductWrite,
    category_ids: &[i64],
) -> Result<(), DbError> {
    let id = match change {
        Change::Create => f2f_db::insert_product(pool, write).await?,
        Change::Update(id) => {
            f2f_db::update_product(pool, id, write).await?;
            id
        }
        Change::Unchanged(_) => return Ok(()),
    };
    if !category_ids.is_empty() {
        f2f_db::set_product_categories(pool, id, category_ids).await?;
    }
    Ok(())
}
