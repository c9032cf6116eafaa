//! HTTP client for the Resend transactional email API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

const DEFAULT_BASE_URL: &str = "https://api.resend.com/";

/// One email as accepted by `POST /emails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the Resend REST API.
///
/// Use [`ResendClient::new`] for production or [`ResendClient::with_base_url`]
/// to point at a mock server in tests.
pub struct ResendClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl ResendClient {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`NotifyError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("f2f/0.1 (notifications)")
            .build()?;

        // Exactly one trailing slash so `join("emails")` appends a segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| NotifyError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Sends one email and returns the provider's message id.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::Api`] if the API answers with a non-2xx status.
    /// - [`NotifyError::Http`] on network failure.
    /// - [`NotifyError::Deserialize`] if the success body has no `id`.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<String, NotifyError> {
        let url = self
            .base_url
            .join("emails")
            .map_err(|e| NotifyError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SendResponse =
            serde_json::from_str(&body).map_err(|e| NotifyError::Deserialize {
                context: "POST /emails".to_owned(),
                source: e,
            })?;
        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ResendClient::with_base_url("re_test", 5, "not a url");
        assert!(matches!(result, Err(NotifyError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn text_part_is_omitted_when_absent() {
        let email = OutgoingEmail {
            from: "Farm2Fork <rendeles@farm2fork.hu>".to_owned(),
            to: vec!["anna@example.hu".to_owned()],
            subject: "Teszt".to_owned(),
            html: "<p>x</p>".to_owned(),
            text: None,
        };
        let json = serde_json::to_value(&email).unwrap();
        assert!(json.get("text").is_none());
        assert_eq!(json["to"][0], "anna@example.hu");
    }
}
