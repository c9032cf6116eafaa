use thiserror::Error;

#[derive(Debug, Error)]
pub enum WooError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by WooCommerce (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("WooCommerce rejected the credentials for {url}")]
    Unauthorized { url: String },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("normalization error for {entity} {woo_id}: {reason}")]
    Normalization {
        entity: &'static str,
        woo_id: i64,
        reason: String,
    },

    #[error("pagination limit reached for {endpoint}: exceeded {max_pages} pages")]
    PaginationLimit { endpoint: String, max_pages: u32 },

    #[error("invalid WooCommerce base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("image upload failed for {source_url}: {reason}")]
    ImageUpload { source_url: String, reason: String },
}
