//! Render execution: turn a persisted plan into MP4s.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use recut_agent::to_render_edl;
use recut_media::render::RenderInput;
use recut_media::{probe_media, RenderOptions, Renderer};
use recut_models::{
    AspectRatio, EditPlan, EditRequest, MediaId, Transcript, TranscriptSegment, TranscriptionData,
};
use recut_queue::ApplyEditJob;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

/// Render a plan against its request, once per aspect ratio.
///
/// Returns output paths keyed by aspect-ratio label. Outputs land at
/// `processed/<owner_id>/edited_<AR>.mp4`.
pub async fn render_plan(
    ctx: &WorkerContext,
    owner_id: &str,
    request: &EditRequest,
    plan: &EditPlan,
    aspect_ratios: &[AspectRatio],
) -> WorkerResult<BTreeMap<String, String>> {
    let edl = to_render_edl(&plan.edl);
    if edl.is_empty() {
        return Err(WorkerError::ValidationFailure(
            "no valid segments in edit plan after conversion".to_string(),
        ));
    }

    let inputs = build_render_inputs(ctx, request).await?;
    let has_transcript = inputs.iter().any(|i| {
        i.transcript
            .as_ref()
            .is_some_and(|t| !t.segments.is_empty())
    });

    let work_dir = Path::new(&ctx.config.work_dir).join(owner_id);
    let renderer = Renderer::new(
        &work_dir,
        RenderOptions {
            captions: has_transcript,
            segment_timeout_secs: ctx.config.subprocess_timeout.as_secs(),
            ..RenderOptions::default()
        },
    );

    let mut outputs = BTreeMap::new();
    for aspect in aspect_ratios {
        let output = ctx.layout.render_output(owner_id, *aspect);
        let rendered = renderer.render(&inputs, &edl, *aspect, &output).await?;
        info!(owner_id, aspect = %aspect, "render complete: {}", rendered.display());
        outputs.insert(
            aspect.as_label().to_string(),
            rendered.to_string_lossy().into_owned(),
        );
    }
    Ok(outputs)
}

/// Full handler for a standalone apply job, including job-record
/// bookkeeping.
pub async fn run_apply(ctx: &WorkerContext, job: &ApplyEditJob) -> WorkerResult<()> {
    let mut record = match ctx
        .store
        .try_get_job(&job.job_id)
        .await
        .map_err(WorkerError::from)?
    {
        Some(record) if record.state.is_terminal() => return Err(WorkerError::Cancelled),
        Some(record) => record,
        None => recut_models::JobRecord::new(
            job.job_id.clone(),
            recut_models::JobKind::Apply,
            serde_json::to_value(job).unwrap_or(serde_json::Value::Null),
        ),
    };
    record.start();
    record.set_stage("apply");
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;

    let outputs = apply_edit(ctx, job).await?;
    record.output_paths = outputs;
    record.complete();
    ctx.store.put_job(&record).await.map_err(WorkerError::from)?;
    Ok(())
}

/// Handler for a standalone apply job: load the persisted plan and
/// the originating request, then render.
pub async fn apply_edit(
    ctx: &WorkerContext,
    job: &ApplyEditJob,
) -> WorkerResult<BTreeMap<String, String>> {
    let plan = ctx
        .store
        .get_plan(&job.plan_job_id)
        .await
        .map_err(WorkerError::from)?
        .ok_or_else(|| WorkerError::not_found(format!("plan for job {}", job.plan_job_id)))?;

    let source_record = ctx
        .store
        .get_job(&job.plan_job_id)
        .await
        .map_err(WorkerError::from)?;
    let request: EditRequest = serde_json::from_value(source_record.input)
        .map_err(|e| WorkerError::invalid_input(format!("unreadable request snapshot: {e}")))?;

    render_plan(ctx, job.job_id.as_str(), &request, &plan, &job.aspect_ratios).await
}

/// Download every source into the cache and assemble renderer inputs.
async fn build_render_inputs(
    ctx: &WorkerContext,
    request: &EditRequest,
) -> WorkerResult<Vec<RenderInput>> {
    let mut inputs = Vec::with_capacity(request.videos_data.len());
    for video in &request.videos_data {
        let media_id = MediaId::from_string(&video.video_id);
        let path = ctx
            .fetcher
            .fetch(&video.video_url, &media_id, None)
            .await?;

        let (duration, width, height) = match probe_media(&path).await {
            Ok(probed) => (probed.duration, probed.width, probed.height),
            Err(e) => {
                // Fall back to the declared duration; the renderer
                // still validates every segment against it.
                let declared = video.effective_duration();
                if declared <= 0.0 {
                    return Err(e.into());
                }
                warn!(
                    "probe of {} failed ({e}); using declared duration {declared:.2}s",
                    path.display()
                );
                (declared, 0, 0)
            }
        };

        inputs.push(RenderInput {
            media_id: media_id.clone(),
            source: path.to_string_lossy().into_owned(),
            cached_copy: Some(path),
            duration,
            width,
            height,
            transcript: video
                .transcription
                .as_ref()
                .map(|t| transcript_from_request(media_id.clone(), t)),
        });
    }
    Ok(inputs)
}

/// Build a transcript from request-supplied transcription data.
pub fn transcript_from_request(media_id: MediaId, data: &TranscriptionData) -> Transcript {
    let segments = data
        .transcript_data
        .iter()
        .map(|s| TranscriptSegment {
            start: s.start,
            end: s.end,
            text: s.text.clone(),
            speaker: s.speaker.clone(),
            words: Vec::new(),
            avg_logprob: None,
        })
        .collect();
    Transcript::new(
        media_id,
        segments,
        data.language_code.clone().unwrap_or_else(|| "en".to_string()),
    )
}
