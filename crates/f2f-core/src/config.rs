use crate::app_config::{AppConfig, Environment, WooConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("F2F_ENV", "development"))?;

    let bind_addr = parse_addr("F2F_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("F2F_LOG_LEVEL", "info");
    let api_key_hash_salt = or_default("F2F_API_KEY_HASH_SALT", "");

    let db_max_connections = parse_u32("F2F_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("F2F_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("F2F_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let woo = match optional("F2F_WOO_BASE_URL") {
        Some(base_url) => Some(WooConfig {
            base_url,
            consumer_key: require("F2F_WOO_CONSUMER_KEY")?,
            consumer_secret: require("F2F_WOO_CONSUMER_SECRET")?,
        }),
        None => None,
    };
    let woo_request_timeout_secs = parse_u64("F2F_WOO_REQUEST_TIMEOUT_SECS", "30")?;
    let woo_user_agent = or_default("F2F_WOO_USER_AGENT", "farm2fork/0.1 (woocommerce-import)");
    let woo_per_page = parse_u32("F2F_WOO_PER_PAGE", "100")?;
    if woo_per_page == 0 || woo_per_page > 100 {
        return Err(ConfigError::InvalidEnvVar {
            var: "F2F_WOO_PER_PAGE".to_string(),
            reason: format!("must be between 1 and 100, got {woo_per_page}"),
        });
    }
    let woo_max_retries = parse_u32("F2F_WOO_MAX_RETRIES", "3")?;
    let woo_retry_backoff_base_secs = parse_u64("F2F_WOO_RETRY_BACKOFF_BASE_SECS", "2")?;

    let image_upload_url = optional("F2F_IMAGE_UPLOAD_URL");
    let resend_api_key = optional("F2F_RESEND_API_KEY");
    let resend_base_url = or_default("F2F_RESEND_BASE_URL", "https://api.resend.com");
    let from_email = or_default(
        "F2F_FROM_EMAIL",
        "Farm2Fork webshop <noreply@farm2fork.hu>",
    );
    let email_templates_path = PathBuf::from(or_default(
        "F2F_EMAIL_TEMPLATES_PATH",
        "./config/email_templates.yaml",
    ));
    let shipment_reconcile_cron = or_default("F2F_SHIPMENT_RECONCILE_CRON", "0 */15 * * * *");

    if !matches!(env, Environment::Development) && api_key_hash_salt.is_empty() {
        return Err(ConfigError::MissingEnvVar(
            "F2F_API_KEY_HASH_SALT".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_key_hash_salt,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        woo,
        woo_request_timeout_secs,
        woo_user_agent,
        woo_per_page,
        woo_max_retries,
        woo_retry_backoff_base_secs,
        image_upload_url,
        resend_api_key,
        resend_base_url,
        from_email,
        email_templates_path,
        shipment_reconcile_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "F2F_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
