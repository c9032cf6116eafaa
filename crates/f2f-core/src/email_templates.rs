use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

/// Events that send a templated email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTrigger {
    Registration,
    OrderPlaced,
    OrderConfirmed,
    OrderShipping,
    OrderDelivered,
    OrderCancelled,
    PasswordReset,
}

impl EmailTrigger {
    pub const ALL: [EmailTrigger; 7] = [
        Self::Registration,
        Self::OrderPlaced,
        Self::OrderConfirmed,
        Self::OrderShipping,
        Self::OrderDelivered,
        Self::OrderCancelled,
        Self::PasswordReset,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::OrderPlaced => "order_placed",
            Self::OrderConfirmed => "order_confirmed",
            Self::OrderShipping => "order_shipping",
            Self::OrderDelivered => "order_delivered",
            Self::OrderCancelled => "order_cancelled",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for EmailTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailTrigger {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::InvalidEmailTrigger(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub trigger: EmailTrigger,
    pub subject: String,
    pub body: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct EmailTemplatesFile {
    pub templates: Vec<EmailTemplate>,
}

/// Load and validate the email template seed file.
///
/// # Errors
///
/// Returns [`ConfigError::TemplatesFileIo`] if the file cannot be read,
/// [`ConfigError::TemplatesFileParse`] if it is not valid YAML, or
/// [`ConfigError::Validation`] if a template is malformed or duplicated.
pub fn load_email_templates(path: &Path) -> Result<EmailTemplatesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TemplatesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: EmailTemplatesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::TemplatesFileParse)?;

    validate_templates(&file)?;

    Ok(file)
}

fn validate_templates(file: &EmailTemplatesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for template in &file.templates {
        if template.subject.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "template '{}' has an empty subject",
                template.trigger
            )));
        }
        if template.body.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "template '{}' has an empty body",
                template.trigger
            )));
        }
        if !seen.insert(template.trigger) {
            return Err(ConfigError::Validation(format!(
                "duplicate template for trigger '{}'",
                template.trigger
            )));
        }
    }

    Ok(())
}
