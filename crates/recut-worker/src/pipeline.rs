//! The end-to-end pipeline: generate -> apply -> upload -> callback.

use tracing::{info, warn};

use recut_agent::{StorytellingAgent, VideoInventory};
use recut_models::{
    EditPlan, EditRequest, FrameRecord, JobId, JobRecord, MediaId, SceneRecord,
};
use recut_queue::{GeneratePlanJob, PipelineJob};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::render_job::{render_plan, transcript_from_request};
use crate::webhook;

const RENDER_BUCKET: &str = "renders";

/// Run the full pipeline for one job.
///
/// The four stages are strictly sequential; the job record is updated
/// at every stage boundary, which is also where external cancellation
/// (the record marked failed from outside) is observed. Downloaded
/// inputs stay cached under the media temp dirs for the whole job and
/// are retained afterwards for debugging.
pub async fn run_pipeline(ctx: &WorkerContext, job: &PipelineJob) -> WorkerResult<()> {
    let logger = JobLogger::new(&job.job_id, "pipeline");
    let mut record = load_active_record(ctx, &job.job_id).await?;
    record.start();

    // Stage 1: generate.
    record.set_stage("generate");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;
    logger.start("generating edit plan");

    let plan = generate_plan(ctx, &job.request).await?;
    ctx.store
        .put_plan(&job.job_id, &plan)
        .await
        .map_err(WorkerError::from)?;
    logger.progress(&format!(
        "plan generated: {} segments, {:.1}s keep coverage",
        plan.edl.len(),
        plan.keep_coverage_seconds()
    ));

    // Stage 2: apply.
    ensure_not_cancelled(ctx, &job.job_id).await?;
    record.set_stage("apply");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;

    let outputs = render_plan(
        ctx,
        job.job_id.as_str(),
        &job.request,
        &plan,
        &job.request.aspect_ratios,
    )
    .await?;
    record.output_paths = outputs.clone();
    logger.progress(&format!("rendered {} aspect ratios", outputs.len()));

    // Stage 3: upload.
    ensure_not_cancelled(ctx, &job.job_id).await?;
    record.set_stage("upload");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;

    let callback_requested = job.request.callback_url.is_some();
    match &ctx.storage {
        Some(storage) => {
            let folder = format!("ai-edits/{}", job.job_id);
            for (label, path) in &outputs {
                let filename = format!("edited_{label}.mp4");
                match storage
                    .upload(path, RENDER_BUCKET, Some(&folder), &filename)
                    .await
                {
                    Ok(url) => {
                        record.output_urls.insert(label.clone(), url);
                    }
                    Err(e) if callback_requested => return Err(e.into()),
                    Err(e) => {
                        // Without a webhook the local render is the
                        // deliverable; keep going.
                        warn!("upload of {filename} failed (non-fatal): {e}");
                    }
                }
            }
        }
        None if callback_requested => {
            return Err(WorkerError::DependencyUnavailable(
                "object storage (required for callback delivery)".to_string(),
            ));
        }
        None => logger.progress("object storage not configured, keeping local outputs"),
    }

    // Stage 4: callback.
    ensure_not_cancelled(ctx, &job.job_id).await?;
    record.set_stage("callback");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;

    if let Some(url) = &job.request.callback_url {
        let storage_url = record
            .output_urls
            .values()
            .next()
            .cloned()
            .unwrap_or_default();
        if let Err(e) = webhook::send(url, &storage_url, job.request.callback_data.as_ref()).await
        {
            // Render artifacts are already persisted.
            warn!("webhook delivery failed (non-fatal): {e}");
        }
    }

    record.complete();
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;
    logger.completion("pipeline finished");
    Ok(())
}

/// Handler for a generate-only job.
pub async fn run_generate(ctx: &WorkerContext, job: &GeneratePlanJob) -> WorkerResult<EditPlan> {
    let mut record = load_active_record(ctx, &job.job_id).await?;
    record.start();
    record.set_stage("generate");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;

    let plan = generate_plan(ctx, &job.request).await?;
    ctx.store
        .put_plan(&job.job_id, &plan)
        .await
        .map_err(WorkerError::from)?;

    record.complete();
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;
    Ok(plan)
}

async fn generate_plan(ctx: &WorkerContext, request: &EditRequest) -> WorkerResult<EditPlan> {
    let inventories = inventories_from_request(request)?;
    let agent = StorytellingAgent::new(ctx.llm()?);
    let plan = agent
        .generate_plan(&inventories, &request.summary, &request.story_prompt)
        .await?;
    Ok(plan)
}

/// Convert the request corpus into agent inventories.
pub fn inventories_from_request(request: &EditRequest) -> WorkerResult<Vec<VideoInventory>> {
    if request.videos_data.is_empty() {
        return Err(WorkerError::invalid_input("no videos in request"));
    }

    let mut inventories = Vec::with_capacity(request.videos_data.len());
    for video in &request.videos_data {
        if video.video_url.is_empty() {
            return Err(WorkerError::invalid_input(format!(
                "video_url is required for video {}",
                video.video_id
            )));
        }
        let duration = video.effective_duration();
        if duration <= 0.0 {
            return Err(WorkerError::invalid_input(format!(
                "no usable duration for video {} (provide duration_seconds or scenes)",
                video.video_id
            )));
        }

        let media_id = MediaId::from_string(&video.video_id);
        let frames = video
            .frames
            .iter()
            .enumerate()
            .map(|(n, f)| {
                FrameRecord::pending(media_id.clone(), n as u32, f.frame_timestamp)
                    .complete(f.description.clone())
            })
            .collect();
        let scenes = video
            .scenes
            .iter()
            .enumerate()
            .map(|(i, s)| SceneRecord {
                media_id: media_id.clone(),
                index: i as u32,
                start: s.start,
                end: s.end,
                caption: s.description.clone(),
                metadata: Default::default(),
            })
            .collect();
        let transcript = video
            .transcription
            .as_ref()
            .map(|t| transcript_from_request(media_id.clone(), t));

        inventories.push(VideoInventory {
            media_id,
            source_url: video.video_url.clone(),
            duration,
            title: video.title.clone(),
            frames,
            scenes,
            transcript,
        });
    }
    Ok(inventories)
}

/// Load the job record, refusing to touch one already terminal.
async fn load_active_record(ctx: &WorkerContext, job_id: &JobId) -> WorkerResult<JobRecord> {
    let record = ctx.store.get_job(job_id).await.map_err(WorkerError::from)?;
    if record.state.is_terminal() {
        info!(job_id = %job_id, "job already terminal, skipping");
        return Err(WorkerError::Cancelled);
    }
    Ok(record)
}

/// Cancellation check at a stage boundary.
async fn ensure_not_cancelled(ctx: &WorkerContext, job_id: &JobId) -> WorkerResult<()> {
    let record = ctx.store.get_job(job_id).await.map_err(WorkerError::from)?;
    if record.state.is_terminal() {
        info!(job_id = %job_id, "job cancelled externally, aborting pipeline");
        return Err(WorkerError::Cancelled);
    }
    Ok(())
}
