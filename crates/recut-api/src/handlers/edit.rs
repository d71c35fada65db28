//! Render-job status endpoint.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use recut_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/edit/{edit_job_id}
///
/// Render-job status with output paths converted to URLs rooted at
/// `/storage/`.
pub async fn get_edit_job(
    State(state): State<AppState>,
    Path(edit_job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let job_id = JobId::from_string(edit_job_id);
    let record = state
        .store
        .try_get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("edit job {job_id}")))?;

    let output_urls: serde_json::Map<String, serde_json::Value> = record
        .output_paths
        .iter()
        .filter_map(|(label, path)| {
            state
                .layout
                .public_path(std::path::Path::new(path))
                .map(|url| (label.clone(), serde_json::Value::String(url)))
        })
        .collect();

    Ok(Json(json!({
        "edit_job_id": record.id,
        "status": record.state,
        "current_stage": record.current_stage,
        "output_urls": output_urls,
        "storage_urls": record.output_urls,
        "error_message": record.error,
        "retry_count": record.retry_count,
        "created_at": record.created_at,
        "completed_at": record.completed_at,
    })))
}
