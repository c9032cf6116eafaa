use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use f2f_core::{EmailTemplate, EmailTrigger};
use f2f_notify::NotifyError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct EmailTemplateItem {
    trigger: String,
    subject: String,
    body: String,
    enabled: bool,
    updated_at: DateTime<Utc>,
}

impl From<f2f_db::EmailTemplateRow> for EmailTemplateItem {
    fn from(row: f2f_db::EmailTemplateRow) -> Self {
        Self {
            trigger: row.trigger,
            subject: row.subject,
            body: row.body,
            enabled: row.enabled,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UpsertTemplateRequest {
    pub subject: String,
    pub body: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnabledRequest {
    pub enabled: bool,
}

/// Test send. With `subject` and `body` the unsaved draft is sent; otherwise
/// the stored template for `trigger` is used.
#[derive(Debug, Deserialize)]
pub(super) struct TestEmailRequest {
    pub trigger: EmailTrigger,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub to: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TestEmailResult {
    message_id: String,
}

fn default_enabled() -> bool {
    true
}

pub(super) async fn list_templates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<EmailTemplateItem>>>, ApiError> {
    let rows = f2f_db::list_email_templates(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(EmailTemplateItem::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn upsert_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(trigger): Path<EmailTrigger>,
    Json(body): Json<UpsertTemplateRequest>,
) -> Result<Json<ApiResponse<EmailTemplateItem>>, ApiError> {
    let rid = &req_id.0;

    if body.subject.trim().is_empty() || body.body.trim().is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "subject and body must not be empty",
        ));
    }

    let template = EmailTemplate {
        trigger,
        subject: body.subject,
        body: body.body,
        enabled: body.enabled,
    };
    let row = f2f_db::upsert_email_template(&state.pool, &template)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(ApiResponse::new(EmailTemplateItem::from(row), req_id.0))
}

pub(super) async fn set_enabled(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(trigger): Path<EmailTrigger>,
    Json(body): Json<EnabledRequest>,
) -> Result<StatusCode, ApiError> {
    f2f_db::set_email_template_enabled(&state.pool, trigger, body.enabled)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn send_test_email(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TestEmailRequest>,
) -> Result<Json<ApiResponse<TestEmailResult>>, ApiError> {
    let rid = &req_id.0;

    let Some(notifier) = state.notifier.as_ref() else {
        return Err(ApiError::new(
            rid,
            "service_unavailable",
            "email delivery is not configured",
        ));
    };

    let template = match (body.subject, body.body) {
        (Some(subject), Some(draft)) => EmailTemplate {
            trigger: body.trigger,
            subject,
            body: draft,
            enabled: true,
        },
        _ => {
            let row = f2f_db::get_email_template(&state.pool, body.trigger)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?
                .ok_or_else(|| {
                    ApiError::new(
                        rid,
                        "not_found",
                        format!("no template stored for {}", body.trigger),
                    )
                })?;
            EmailTemplate::try_from(row).map_err(|e| map_db_error(rid.clone(), &e))?
        }
    };

    let message_id = notifier
        .send_test(&template, body.to.as_deref(), body.name.as_deref())
        .await
        .map_err(|e| map_notify_error(rid, &e))?;

    Ok(ApiResponse::new(TestEmailResult { message_id }, req_id.0))
}

fn map_notify_error(request_id: &str, error: &NotifyError) -> ApiError {
    match error {
        NotifyError::TemplateDisabled(_) | NotifyError::TemplateMissing(_) => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "email delivery failed");
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
    }
}
