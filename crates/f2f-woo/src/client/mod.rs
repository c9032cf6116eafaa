//! HTTP client for the WooCommerce REST API (`/wp-json/wc/v3`).

mod fetch_all;

use std::time::Duration;

use f2f_core::{AppConfig, WooConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::WooError;
use crate::pagination::{parse_total_pages, TOTAL_PAGES_HEADER};
use crate::rate_limit::retry_with_backoff;

/// Maximum number of pages fetched from one endpoint before giving up.
///
/// Each page may be retried up to `max_retries` times, so the worst-case
/// request count is `MAX_PAGES * (1 + max_retries)`.
pub(super) const MAX_PAGES: u32 = 200;

const API_PREFIX: &str = "wp-json/wc/v3";

/// Transport settings shared by every request of a [`WooClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Page size, 1..=100 (WooCommerce caps `per_page` at 100).
    pub per_page: u32,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl ClientOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.woo_request_timeout_secs,
            user_agent: config.woo_user_agent.clone(),
            per_page: config.woo_per_page,
            max_retries: config.woo_max_retries,
            backoff_base_secs: config.woo_retry_backoff_base_secs,
        }
    }
}

/// Authenticated WooCommerce REST client.
///
/// Requests use HTTP basic auth with the consumer key and secret. 429,
/// network failures and 5xx responses are retried with exponential backoff;
/// 401/403 and 404 are returned as typed errors without retrying.
pub struct WooClient {
    pub(super) client: Client,
    pub(super) base_url: String,
    consumer_key: String,
    consumer_secret: String,
    pub(super) per_page: u32,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl WooClient {
    /// # Errors
    ///
    /// Returns [`WooError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(woo: &WooConfig, options: &ClientOptions) -> Result<Self, WooError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&options.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: woo.base_url.trim_end_matches('/').to_owned(),
            consumer_key: woo.consumer_key.clone(),
            consumer_secret: woo.consumer_secret.clone(),
            per_page: options.per_page.clamp(1, 100),
            max_retries: options.max_retries,
            backoff_base_secs: options.backoff_base_secs,
        })
    }

    /// Fetches one page of a collection endpoint, returning the items and the
    /// `X-WP-TotalPages` value when present.
    ///
    /// # Errors
    ///
    /// - [`WooError::RateLimited`]: HTTP 429 after all retries.
    /// - [`WooError::Unauthorized`]: HTTP 401/403.
    /// - [`WooError::NotFound`]: HTTP 404.
    /// - [`WooError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`WooError::Deserialize`]: the body is not the expected JSON.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
    ) -> Result<(Vec<T>, Option<u32>), WooError> {
        let url = Self::endpoint_url(&self.base_url, endpoint, Some((self.per_page, page)))?;

        self.get_with_retry(&url, |response_headers, body| {
            let total_pages = parse_total_pages(
                response_headers
                    .get(TOTAL_PAGES_HEADER)
                    .and_then(|v| v.to_str().ok()),
            );
            let items = serde_json::from_str::<Vec<T>>(body).map_err(|e| WooError::Deserialize {
                context: format!("{endpoint} page {page}"),
                source: e,
            })?;
            Ok((items, total_pages))
        })
        .await
    }

    /// Checks connectivity and credentials; returns the WordPress version.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_page`].
    pub async fn ping(&self) -> Result<String, WooError> {
        let url = Self::endpoint_url(&self.base_url, "system_status", None)?;
        self.get_with_retry(&url, |_, body| {
            let status: serde_json::Value =
                serde_json::from_str(body).map_err(|e| WooError::Deserialize {
                    context: "system_status".to_owned(),
                    source: e,
                })?;
            Ok(status
                .pointer("/environment/wp_version")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown")
                .to_owned())
        })
        .await
    }

    async fn get_with_retry<T, P>(&self, url: &str, parse: P) -> Result<T, WooError>
    where
        P: Fn(&reqwest::header::HeaderMap, &str) -> Result<T, WooError>,
    {
        let parse = &parse;
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(WooError::RateLimited { retry_after_secs });
            }
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(WooError::Unauthorized {
                    url: url.to_owned(),
                });
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(WooError::NotFound {
                    url: url.to_owned(),
                });
            }
            if !status.is_success() {
                return Err(WooError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            let headers = response.headers().clone();
            let body = response.text().await?;
            parse(&headers, &body)
        })
        .await
    }

    /// Builds `{base}/wp-json/wc/v3/{endpoint}` with optional paging parameters.
    ///
    /// A base URL that already ends in `/wp-json/wc/v3` is used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`WooError::InvalidBaseUrl`] if the result is not a valid URL.
    fn endpoint_url(
        base_url: &str,
        endpoint: &str,
        paging: Option<(u32, u32)>,
    ) -> Result<String, WooError> {
        let base = base_url.trim_end_matches('/');
        let joined = if base.ends_with(API_PREFIX) {
            format!("{base}/{endpoint}")
        } else {
            format!("{base}/{API_PREFIX}/{endpoint}")
        };
        let mut url = reqwest::Url::parse(&joined).map_err(|e| WooError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        if let Some((per_page, page)) = paging {
            url.query_pairs_mut()
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());
        }

        Ok(url.to_string())
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
