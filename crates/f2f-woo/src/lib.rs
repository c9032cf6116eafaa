pub mod client;
pub mod error;
pub mod images;
pub mod normalize;
pub mod pagination;
pub mod reconcile;
pub mod types;

mod rate_limit;

pub use client::{ClientOptions, WooClient};
pub use error::WooError;
pub use images::{extract_filename_from_url, upload_filename, ImageFolder, ImageUploader};
pub use normalize::{
    map_order_status, normalize_category, normalize_order, normalize_producer, normalize_product,
    parse_pickup_time, CategoryDraft, ProducerDraft, ProductDraft,
};
pub use reconcile::{
    match_stored, name_index, plan_category, plan_category_parents, plan_producer, plan_product,
    woo_id_index, Change, ParentLink, ProgressFn, SyncReport,
};
pub use types::{
    meta_value, WooAddress, WooCategory, WooImage, WooLineItem, WooMeta, WooOrder, WooProducer,
    WooProduct,
};
