use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection settings for the legacy WooCommerce store.
///
/// Present only when `F2F_WOO_BASE_URL` is set; the import commands refuse to
/// run without it.
#[derive(Clone)]
pub struct WooConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for WooConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[redacted]")
            .field("consumer_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_key_hash_salt: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub woo: Option<WooConfig>,
    pub woo_request_timeout_secs: u64,
    pub woo_user_agent: String,
    pub woo_per_page: u32,
    pub woo_max_retries: u32,
    pub woo_retry_backoff_base_secs: u64,
    pub image_upload_url: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub from_email: String,
    pub email_templates_path: PathBuf,
    pub shipment_reconcile_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("api_key_hash_salt", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("woo", &self.woo)
            .field("woo_request_timeout_secs", &self.woo_request_timeout_secs)
            .field("woo_user_agent", &self.woo_user_agent)
            .field("woo_per_page", &self.woo_per_page)
            .field("woo_max_retries", &self.woo_max_retries)
            .field(
                "woo_retry_backoff_base_secs",
                &self.woo_retry_backoff_base_secs,
            )
            .field("image_upload_url", &self.image_upload_url)
            .field(
                "resend_api_key",
                &self.resend_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("resend_base_url", &self.resend_base_url)
            .field("from_email", &self.from_email)
            .field("email_templates_path", &self.email_templates_path)
            .field("shipment_reconcile_cron", &self.shipment_reconcile_cron)
            .finish()
    }
}
