//! Database operations for `email_templates`.

use chrono::{DateTime, Utc};
use f2f_core::{EmailTemplate, EmailTrigger};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailTemplateRow {
    pub trigger: String,
    pub subject: String,
    pub body: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EmailTemplateRow> for EmailTemplate {
    type Error = DbError;

    fn try_from(row: EmailTemplateRow) -> Result<Self, Self::Error> {
        Ok(EmailTemplate {
            trigger: row.trigger.parse::<EmailTrigger>()?,
            subject: row.subject,
            body: row.body,
            enabled: row.enabled,
        })
    }
}

/// Returns all templates ordered by trigger.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_email_templates(pool: &PgPool) -> Result<Vec<EmailTemplateRow>, DbError> {
    let rows = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT trigger, subject, body, enabled, updated_at FROM email_templates ORDER BY trigger",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches the template for a trigger, if one is stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_email_template(
    pool: &PgPool,
    trigger: EmailTrigger,
) -> Result<Option<EmailTemplateRow>, DbError> {
    let row = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT trigger, subject, body, enabled, updated_at FROM email_templates WHERE trigger = $1",
    )
    .bind(trigger.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or replaces the template for `template.trigger`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_email_template(
    pool: &PgPool,
    template: &EmailTemplate,
) -> Result<EmailTemplateRow, DbError> {
    let row = sqlx::query_as::<_, EmailTemplateRow>(
        "INSERT INTO email_templates (trigger, subject, body, enabled) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (trigger) DO UPDATE SET \
             subject    = EXCLUDED.subject, \
             body       = EXCLUDED.body, \
             enabled    = EXCLUDED.enabled, \
             updated_at = NOW() \
         RETURNING trigger, subject, body, enabled, updated_at",
    )
    .bind(template.trigger.as_str())
    .bind(&template.subject)
    .bind(&template.body)
    .bind(template.enabled)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Enables or disables a stored template.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no template exists for the trigger, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_email_template_enabled(
    pool: &PgPool,
    trigger: EmailTrigger,
    enabled: bool,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE email_templates SET enabled = $1, updated_at = NOW() WHERE trigger = $2",
    )
    .bind(enabled)
    .bind(trigger.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
