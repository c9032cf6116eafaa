use f2f_core::EmailTemplate;
use sqlx::PgPool;

use crate::DbError;

/// Insert seed email templates for triggers that have no stored template yet.
///
/// Existing rows are never overwritten, so edits made through the API
/// survive a re-seed. Returns the number of templates inserted. All inserts
/// run inside a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_email_templates(
    pool: &PgPool,
    templates: &[EmailTemplate],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for template in templates {
        let result = sqlx::query(
            "INSERT INTO email_templates (trigger, subject, body, enabled) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (trigger) DO NOTHING",
        )
        .bind(template.trigger.as_str())
        .bind(&template.subject)
        .bind(&template.body)
        .bind(template.enabled)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}
