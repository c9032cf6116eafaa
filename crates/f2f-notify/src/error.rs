use f2f_core::EmailTrigger;
use thiserror::Error;

/// Errors returned by template rendering and email delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The email API answered with a non-2xx status.
    #[error("email API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no email template stored for trigger {0}")]
    TemplateMissing(EmailTrigger),

    #[error("email template {0} is disabled")]
    TemplateDisabled(EmailTrigger),

    #[error("invalid email API base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
