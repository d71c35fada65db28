//! AI edit endpoints: generate, plan lookup, apply.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use recut_models::{AspectRatio, EditRequest, JobId, JobKind, JobRecord, JobState};
use recut_queue::{ApplyEditJob, GeneratePlanJob, PipelineJob, QueueJob};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: String,
    pub is_multi_video: bool,
    pub auto_apply: bool,
    pub aspect_ratios: Vec<AspectRatio>,
}

/// POST /api/ai-edit/generate
///
/// Normalizes the request, snapshots it onto a new job record and
/// enqueues either the full pipeline or a generate-only job.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    validate_request(&request)?;

    let job_id = JobId::new();
    let kind = if request.auto_apply {
        JobKind::Pipeline
    } else {
        JobKind::Generate
    };
    let input = serde_json::to_value(&request)
        .map_err(|e| ApiError::internal(format!("request snapshot failed: {e}")))?;
    let record = JobRecord::new(job_id.clone(), kind, input);
    state.store.put_job(&record).await?;

    let queue_job = if request.auto_apply {
        QueueJob::Pipeline(PipelineJob {
            job_id: job_id.clone(),
            request: request.clone(),
        })
    } else {
        QueueJob::GeneratePlan(GeneratePlanJob {
            job_id: job_id.clone(),
            request: request.clone(),
        })
    };
    state.queue.enqueue(&queue_job).await?;

    info!(job_id = %job_id, auto_apply = request.auto_apply, "edit job queued");
    metrics::counter!("recut_api_generate_requests_total").increment(1);

    Ok(Json(GenerateResponse {
        job_id: job_id.to_string(),
        status: JobState::Queued.as_str().to_string(),
        is_multi_video: request.is_multi_video(),
        auto_apply: request.auto_apply,
        aspect_ratios: request.aspect_ratios,
    }))
}

/// GET /api/ai-edit/plan/{job_id}
pub async fn get_plan(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let job_id = JobId::from_string(job_id);
    let record = state
        .store
        .try_get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id}")))?;
    let plan = state.store.get_plan(&job_id).await?;

    Ok(Json(json!({
        "job_id": record.id,
        "status": record.state,
        "current_stage": record.current_stage,
        "plan": plan,
        "error_message": record.error,
        "retry_count": record.retry_count,
        "created_at": record.created_at,
        "started_at": record.started_at,
        "completed_at": record.completed_at,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default = "default_aspect_ratios")]
    pub aspect_ratios: Vec<AspectRatio>,
}

fn default_aspect_ratios() -> Vec<AspectRatio> {
    vec![AspectRatio::Wide]
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub job_id: String,
    pub edit_job_id: String,
    pub status: String,
    pub poll_url: String,
}

/// POST /api/ai-edit/apply/{job_id}
///
/// Enqueues a render from an existing, completed plan.
pub async fn apply(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<ApplyRequest>,
) -> ApiResult<Json<ApplyResponse>> {
    let plan_job_id = JobId::from_string(job_id);
    let record = state
        .store
        .try_get_job(&plan_job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {plan_job_id}")))?;

    if record.state != JobState::Completed {
        return Err(ApiError::conflict(format!(
            "job {plan_job_id} is not completed (status: {})",
            record.state
        )));
    }
    if state.store.get_plan(&plan_job_id).await?.is_none() {
        return Err(ApiError::bad_request("no edit plan available"));
    }
    if request.aspect_ratios.is_empty() {
        return Err(ApiError::bad_request("aspect_ratios must not be empty"));
    }

    let edit_job_id = JobId::new();
    let edit_record = JobRecord::new(
        edit_job_id.clone(),
        JobKind::Apply,
        json!({"plan_job_id": plan_job_id, "aspect_ratios": request.aspect_ratios}),
    );
    state.store.put_job(&edit_record).await?;

    state
        .queue
        .enqueue(&QueueJob::ApplyEdit(ApplyEditJob {
            job_id: edit_job_id.clone(),
            plan_job_id: plan_job_id.clone(),
            aspect_ratios: request.aspect_ratios,
        }))
        .await?;

    info!(job_id = %plan_job_id, edit_job_id = %edit_job_id, "render job queued");

    Ok(Json(ApplyResponse {
        job_id: plan_job_id.to_string(),
        edit_job_id: edit_job_id.to_string(),
        status: JobState::Queued.as_str().to_string(),
        poll_url: format!("/api/edit/{edit_job_id}"),
    }))
}

/// Reject malformed generate requests before anything is enqueued.
fn validate_request(request: &EditRequest) -> ApiResult<()> {
    if request.videos_data.is_empty() {
        return Err(ApiError::bad_request(
            "videos_data is required: provide at least one video",
        ));
    }
    for video in &request.videos_data {
        if video.video_id.is_empty() {
            return Err(ApiError::bad_request("video_id must not be empty"));
        }
        if video.video_url.is_empty() {
            return Err(ApiError::bad_request(format!(
                "video_url is required for video {}",
                video.video_id
            )));
        }
        if video.effective_duration() <= 0.0 {
            return Err(ApiError::bad_request(format!(
                "no usable duration for video {} (provide duration_seconds or scenes)",
                video.video_id
            )));
        }
    }
    if request.aspect_ratios.is_empty() {
        return Err(ApiError::bad_request("aspect_ratios must not be empty"));
    }
    Ok(())
}
