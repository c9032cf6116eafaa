//! Trigger-driven sending on top of [`ResendClient`].
//!
//! Callers load the stored [`EmailTemplate`] for a trigger and hand it in;
//! this module decides whether to send, renders the tokens, wraps the body in
//! the branded layout and delivers it.

use chrono::NaiveDate;
use f2f_core::{EmailTemplate, EmailTrigger};

use crate::client::{OutgoingEmail, ResendClient};
use crate::error::NotifyError;
use crate::layout::{expected_delivery_section, EmailLayout};
use crate::render::{render, TemplateVars};

const TEST_NAME_FALLBACK: &str = "Felhasználó";
const TEST_RECIPIENT_FALLBACK: &str = "felhasznalo@pelda.hu";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub name: Option<String>,
}

impl Recipient {
    #[must_use]
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }

    /// Name used for `{{name}}`: the given name, else the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { id: String },
    /// The template exists but is switched off.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub struct Notifier {
    client: ResendClient,
    from: String,
    layout: EmailLayout,
}

impl Notifier {
    #[must_use]
    pub fn new(client: ResendClient, from: impl Into<String>) -> Self {
        Self {
            client,
            from: from.into(),
            layout: EmailLayout::default(),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: EmailLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Substitutes tokens in subject and body and wraps the body in the layout.
    #[must_use]
    pub fn compose(&self, template: &EmailTemplate, vars: &TemplateVars) -> RenderedEmail {
        let subject = render(&template.subject, vars);
        let body = render(&template.body, vars);
        let html = self.layout.wrap(&subject, &body);
        RenderedEmail { subject, html }
    }

    /// Sends the email for `trigger`, filling `{{name}}` from the recipient
    /// unless `vars` already carries it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TemplateMissing`] when no template is stored for
    /// the trigger, or any delivery error from [`ResendClient::send`].
    pub async fn send_for_trigger(
        &self,
        trigger: EmailTrigger,
        template: Option<&EmailTemplate>,
        to: &Recipient,
        mut vars: TemplateVars,
    ) -> Result<SendOutcome, NotifyError> {
        let template = template.ok_or(NotifyError::TemplateMissing(trigger))?;
        if !template.enabled {
            tracing::info!(%trigger, to = %to.email, "email template disabled, skipping");
            return Ok(SendOutcome::Skipped);
        }
        if vars.get("name").is_none() {
            vars.insert("name", to.display_name());
        }

        let rendered = self.compose(template, &vars);
        let id = self.deliver(&to.email, rendered).await?;
        tracing::info!(%trigger, to = %to.email, message_id = %id, "email sent");
        Ok(SendOutcome::Sent { id })
    }

    /// Order confirmation with `{{order_id}}` and the expected delivery banner.
    ///
    /// # Errors
    ///
    /// Same as [`Notifier::send_for_trigger`].
    pub async fn send_order_placed(
        &self,
        template: Option<&EmailTemplate>,
        to: &Recipient,
        order_id: &str,
        expected_delivery: Option<NaiveDate>,
    ) -> Result<SendOutcome, NotifyError> {
        let vars = TemplateVars::new()
            .with("name", to.display_name())
            .with("order_id", order_id)
            .with(
                "expected_delivery_section",
                expected_delivery_section(expected_delivery),
            );
        self.send_for_trigger(EmailTrigger::OrderPlaced, template, to, vars)
            .await
    }

    /// Sends a preview of `template` to an admin-chosen address.
    ///
    /// Without a recipient the placeholder address is used; without a name the
    /// generic "Felhasználó" greeting is rendered.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TemplateDisabled`] for a disabled template, or
    /// any delivery error from [`ResendClient::send`].
    pub async fn send_test(
        &self,
        template: &EmailTemplate,
        to: Option<&str>,
        name: Option<&str>,
    ) -> Result<String, NotifyError> {
        if !template.enabled {
            return Err(NotifyError::TemplateDisabled(template.trigger));
        }
        let to = to
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(TEST_RECIPIENT_FALLBACK);
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(TEST_NAME_FALLBACK);

        let rendered = self.compose(template, &TemplateVars::new().with("name", name));
        let id = self.deliver(to, rendered).await?;
        tracing::info!(trigger = %template.trigger, to, message_id = %id, "test email sent");
        Ok(id)
    }

    async fn deliver(&self, to: &str, rendered: RenderedEmail) -> Result<String, NotifyError> {
        let email = OutgoingEmail {
            from: self.from.clone(),
            to: vec![to.to_owned()],
            subject: rendered.subject,
            html: rendered.html,
            text: None,
        };
        self.client.send(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(
            Recipient::new("anna@example.hu", Some("Kiss Anna".to_owned())).display_name(),
            "Kiss Anna"
        );
        assert_eq!(
            Recipient::new("anna@example.hu", Some("  ".to_owned())).display_name(),
            "anna@example.hu"
        );
        assert_eq!(Recipient::new("anna@example.hu", None).display_name(), "anna@example.hu");
    }

    #[test]
    fn compose_renders_subject_and_body() {
        let client = ResendClient::with_base_url("re_test", 5, "http://127.0.0.1:9").unwrap();
        let notifier = Notifier::new(client, "Farm2Fork <rendeles@farm2fork.hu>");
        let template = EmailTemplate {
            trigger: EmailTrigger::OrderPlaced,
            subject: "Rendelés #{{order_id}}".to_owned(),
            body: "<p>Szia {{name}}!</p>".to_owned(),
            enabled: true,
        };
        let vars = TemplateVars::new().with("order_id", "1042").with("name", "Anna");

        let rendered = notifier.compose(&template, &vars);
        assert_eq!(rendered.subject, "Rendelés #1042");
        assert!(rendered.html.contains("<title>Rendelés #1042</title>"));
        assert!(rendered.html.contains("<p>Szia Anna!</p>"));
    }
}
