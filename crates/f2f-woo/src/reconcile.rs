//! Import bookkeeping and the "skip if unchanged" decisions.
//!
//! Everything here is pure: the importer loads stored rows, asks these
//! functions what to do with each WooCommerce item, performs the writes,
//! and records the outcome in a [`SyncReport`].

use std::collections::HashMap;
use std::fmt::Display;

use f2f_core::{Category, Producer, Product, ROOT_CATEGORY_ID};
use serde::Serialize;

use crate::normalize::{CategoryDraft, ProducerDraft, ProductDraft};
use crate::types::WooCategory;

/// Progress callback: `(processed, total, current_item)`.
pub type ProgressFn<'a> = dyn FnMut(usize, usize, &str) + Send + 'a;

/// Outcome of one entity pass. `success` counts items processed without
/// error (created, updated or unchanged).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: usize,
    pub errors: usize,
    pub details: Vec<String>,
}

impl SyncReport {
    pub fn record(&mut self, entity: &str, name: &str, change: &Change) {
        self.success += 1;
        self.details.push(match change {
            Change::Create => format!("Created new {entity}: {name}"),
            Change::Update(_) => format!("Updated {entity}: {name}"),
            Change::Unchanged(_) => format!("No changes needed for {entity}: {name}"),
        });
    }

    pub fn record_error(&mut self, name: &str, err: impl Display) {
        self.errors += 1;
        self.details.push(format!("Error syncing {name}: {err}"));
    }

    /// The item itself is kept; only its image is missing.
    pub fn image_failed(&mut self, name: &str, err: impl Display) {
        self.details.push(format!("Image upload failed for {name}: {err}"));
    }

    pub fn parent_linked(&mut self, child: &str, parent: &str) {
        self.details
            .push(format!("Updated parent relationship: {child} -> {parent}"));
    }

    pub fn parent_failed(&mut self, name: &str, err: impl Display) {
        self.details
            .push(format!("Error updating parent for {name}: {err}"));
    }
}

/// What to do with one WooCommerce item. Ids refer to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Create,
    Update(i64),
    Unchanged(i64),
}

/// Lower-cased name lookup over stored rows.
pub fn name_index<'a, T>(items: &'a [T], name: impl Fn(&T) -> &str) -> HashMap<String, &'a T> {
    items
        .iter()
        .map(|item| (name(item).trim().to_lowercase(), item))
        .collect()
}

/// Stored rows keyed by WooCommerce id. Rows never imported are left out.
pub fn woo_id_index<'a, T>(items: &'a [T], woo_id: impl Fn(&T) -> Option<i64>) -> HashMap<i64, &'a T> {
    items
        .iter()
        .filter_map(|item| woo_id(item).map(|id| (id, item)))
        .collect()
}

/// The stored row for a WooCommerce item: by WooCommerce id, then by name.
#[must_use]
pub fn match_stored<'a, T>(
    by_woo: &HashMap<i64, &'a T>,
    by_name: &HashMap<String, &'a T>,
    woo_id: i64,
    name: &str,
) -> Option<&'a T> {
    by_woo
        .get(&woo_id)
        .or_else(|| by_name.get(&name.trim().to_lowercase()))
        .copied()
}

/// A provided image always counts as a change.
#[must_use]
pub fn plan_category(existing: Option<&Category>, draft: &CategoryDraft) -> Change {
    let Some(existing) = existing else {
        return Change::Create;
    };
    let needs_update = existing.name != draft.name
        || existing.slug != draft.slug
        || existing.description.as_deref().unwrap_or("") != draft.description
        || existing.order != draft.order
        || existing.woo_id != Some(draft.woo_id)
        || draft.image_src.is_some();
    if needs_update {
        Change::Update(existing.id)
    } else {
        Change::Unchanged(existing.id)
    }
}

#[must_use]
pub fn plan_producer(existing: Option<&Producer>, draft: &ProducerDraft) -> Change {
    let Some(existing) = existing else {
        return Change::Create;
    };
    let needs_update = existing.name != draft.name
        || existing.slug != draft.slug
        || existing.short_description != draft.short_description
        || existing.description != draft.description
        || existing.bio != draft.bio
        || existing.woo_id != Some(draft.woo_id)
        || draft.image_src.is_some();
    if needs_update {
        Change::Update(existing.id)
    } else {
        Change::Unchanged(existing.id)
    }
}

/// `producer_id` is the already-resolved local producer of the draft.
#[must_use]
pub fn plan_product(
    existing: Option<&Product>,
    draft: &ProductDraft,
    producer_id: Option<i64>,
) -> Change {
    let Some(existing) = existing else {
        return Change::Create;
    };
    let needs_update = existing.name != draft.name
        || existing.slug != draft.slug
        || existing.sku != draft.sku
        || existing.gross_price != draft.gross_price
        || existing.net_price != draft.net_price
        || existing.stock != draft.stock
        || existing.backorder != draft.backorder
        || existing.enabled != draft.enabled
        || existing.product_type != draft.product_type
        || existing.producer_id != producer_id
        || existing.woo_id != Some(draft.woo_id)
        || draft.image_src.is_some();
    if needs_update {
        Change::Update(existing.id)
    } else {
        Change::Unchanged(existing.id)
    }
}

/// A parent link the second category pass should write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub child_id: i64,
    pub child_name: String,
    pub parent_id: i64,
    pub parent_name: String,
}

/// Resolves WooCommerce parent ids to stored categories, by WooCommerce id
/// and then by name.
///
/// Links that already hold, that would re-parent the root category, or that
/// point a category at itself are left out. Unresolvable parents are skipped.
#[must_use]
pub fn plan_category_parents(woo: &[WooCategory], stored: &[Category]) -> Vec<ParentLink> {
    let by_woo = woo_id_index(stored, |c| c.woo_id);
    let by_name = name_index(stored, |c| c.name.as_str());
    let woo_names: HashMap<i64, &str> = woo.iter().map(|c| (c.id, c.name.as_str())).collect();

    woo.iter()
        .filter(|c| c.parent > 0)
        .filter_map(|c| {
            let child = match_stored(&by_woo, &by_name, c.id, &c.name)?;
            let parent_name = woo_names.get(&c.parent)?;
            let parent = match_stored(&by_woo, &by_name, c.parent, parent_name)?;
            let already_linked = child.parent_id == Some(parent.id);
            if already_linked || child.id == ROOT_CATEGORY_ID || child.id == parent.id {
                return None;
            }
            Some(ParentLink {
                child_id: child.id,
                child_name: c.name.clone(),
                parent_id: parent.id,
                parent_name: parent.name.clone(),
            })
        })
        .collect()
}
