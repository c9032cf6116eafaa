use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ImportRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportRunItem {
    id: i64,
    import_run_id: Uuid,
    trigger_source: String,
    status: String,
    dry_run: bool,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportEntityItem {
    entity: String,
    success: i32,
    errors: i32,
    details: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportRunDetail {
    #[serde(flatten)]
    run: ImportRunItem,
    entities: Vec<ImportEntityItem>,
}

impl From<f2f_db::ImportRunRow> for ImportRunItem {
    fn from(row: f2f_db::ImportRunRow) -> Self {
        Self {
            id: row.id,
            import_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            dry_run: row.dry_run,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

impl From<f2f_db::ImportRunEntityRow> for ImportEntityItem {
    fn from(row: f2f_db::ImportRunEntityRow) -> Self {
        Self {
            entity: row.entity,
            success: row.success,
            errors: row.errors,
            details: row.details.0,
        }
    }
}

pub(super) async fn list_import_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportRunsQuery>,
) -> Result<Json<ApiResponse<Vec<ImportRunItem>>>, ApiError> {
    let rows = f2f_db::list_import_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ImportRunItem::from).collect();
    Ok(ApiResponse::new(data, req_id.0))
}

/// GET /api/v1/import-runs/{id}: the run plus one report per entity pass.
pub(super) async fn get_import_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ImportRunDetail>>, ApiError> {
    let rid = &req_id.0;

    let run = f2f_db::get_import_run(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let entities = f2f_db::list_import_run_entities(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(ApiResponse::new(
        ImportRunDetail {
            run: run.into(),
            entities: entities.into_iter().map(ImportEntityItem::from).collect(),
        },
        req_id.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_run_detail_flattens_run_fields() {
        let detail = ImportRunDetail {
            run: ImportRunItem {
                id: 7,
                import_run_id: Uuid::new_v4(),
                trigger_source: "cli".to_string(),
                status: "succeeded".to_string(),
                dry_run: false,
                started_at: Some(Utc::now()),
                completed_at: Some(Utc::now()),
                error_message: None,
                created_at: Utc::now(),
            },
            entities: vec![ImportEntityItem {
                entity: "orders".to_string(),
                success: 12,
                errors: 1,
                details: vec!["order 991: unknown product 44".to_string()],
            }],
        };

        let json = serde_json::to_value(&detail).expect("serialize import run");
        assert_eq!(json["id"], 7);
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["entities"][0]["entity"], "orders");
        assert_eq!(json["entities"][0]["errors"], 1);
    }
}
