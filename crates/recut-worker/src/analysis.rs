//! Media ingest and analysis: fetch, probe, caption, segment,
//! transcribe.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use recut_media::fetch::md5_file;
use recut_media::frames::{frame_data_url, sample_frames};
use recut_media::{audio, probe_media};
use recut_ml_client::{ImageInput, SceneExtractionRequest};
use recut_models::{
    FrameRecord, MediaDescriptor, MediaStatus, MediaUpdate, SceneRecord, Transcript,
};
use recut_queue::{IngestMediaJob, JobStore};

use crate::context::WorkerContext;
use crate::error::WorkerResult;

/// Outcome of one media analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub media: MediaDescriptor,
    /// Frame counts: (total, completed, failed)
    pub frame_counts: (usize, usize, usize),
    pub scene_count: usize,
    pub transcript_segments: usize,
}

/// Full handler for an ingest job, including job-record bookkeeping.
pub async fn run_ingest(ctx: &WorkerContext, job: &IngestMediaJob) -> WorkerResult<()> {
    let mut record = match ctx
        .store
        .try_get_job(&job.job_id)
        .await
        .map_err(crate::error::WorkerError::from)?
    {
        Some(record) if record.state.is_terminal() => {
            return Err(crate::error::WorkerError::Cancelled)
        }
        Some(record) => record,
        None => recut_models::JobRecord::new(
            job.job_id.clone(),
            recut_models::JobKind::Ingest,
            serde_json::to_value(job).unwrap_or(serde_json::Value::Null),
        ),
    };
    record.start();
    ctx.store
        .put_job(&record)
        .await
        .map_err(crate::error::WorkerError::from)?;

    let result = ingest_media(ctx, job).await;
    match result {
        Ok(report) => {
            record.complete();
            ctx.store
                .put_job(&record)
                .await
                .map_err(crate::error::WorkerError::from)?;
            info!(
                media_id = %report.media.id,
                "ingest job finished ({}/{} frames captioned)",
                report.frame_counts.1,
                report.frame_counts.0
            );
            Ok(())
        }
        Err(e) => {
            // A failing analysis marks the media, not just the job.
            if let Ok(Some(mut media)) = ctx.store.get_media(&job.media_id).await {
                media.apply(MediaUpdate::status(MediaStatus::Failed));
                ctx.store.put_media(&media).await.ok();
            }
            Err(e)
        }
    }
}

/// Run the full analysis pass for one media item.
///
/// Captioning fans out concurrently under the configured bound; a
/// failing frame is recorded as failed and does not abort the media.
/// Existing frame rows are skipped, which makes the pass restartable.
pub async fn ingest_media(
    ctx: &WorkerContext,
    job: &IngestMediaJob,
) -> WorkerResult<AnalysisReport> {
    let media_id = &job.media_id;

    // Download (or reuse the cache) and probe.
    let local_path = ctx.fetcher.fetch(&job.source_url, media_id, None).await?;
    let probed = probe_media(&local_path).await?;
    let digest = md5_file(&local_path).await?;

    let mut media = ctx
        .store
        .get_media(media_id)
        .await?
        .unwrap_or_else(|| MediaDescriptor::new(media_id.clone(), &job.source_url));
    media.apply(MediaUpdate {
        local_path: Some(local_path.to_string_lossy().into_owned()),
        duration_seconds: Some(probed.duration),
        fps: Some(probed.fps),
        width: Some(probed.width),
        height: Some(probed.height),
        video_codec: Some(probed.video_codec.clone()),
        audio_codec: probed.audio_codec.clone(),
        has_audio: Some(probed.has_audio),
        bitrate_kbps: Some(probed.bitrate_kbps),
        aspect_ratio: Some(probed.aspect_ratio.clone()),
        md5: Some(digest),
        status: Some(MediaStatus::Processing),
    });
    ctx.store.put_media(&media).await?;

    // Frame captioning.
    let frame_counts = caption_frames(ctx, job, &local_path).await?;

    // Scene segmentation: the external detector when configured,
    // otherwise a uniform time-based partition.
    let frames = ctx.store.get_frames(media_id).await?;
    let scenes = match ctx.scenes() {
        Some(client) => {
            let extracted = client
                .extract(
                    &job.source_url,
                    &SceneExtractionRequest::shot_based(&job.caption_prompt),
                )
                .await
                .map_err(crate::error::WorkerError::from)?;
            let records: Vec<SceneRecord> = extracted
                .into_iter()
                .enumerate()
                .map(|(i, s)| SceneRecord {
                    media_id: media_id.clone(),
                    index: i as u32,
                    start: s.start,
                    end: s.end,
                    caption: s.description,
                    metadata: s.metadata.unwrap_or_default(),
                })
                .collect();
            normalize_scene_bounds(records, probed.duration)
        }
        None => time_based_scenes(
            media_id.clone(),
            probed.duration,
            ctx.config.scene_fallback_interval,
            &frames,
        ),
    };
    ctx.store.put_scenes(media_id, &scenes).await?;

    // Transcription.
    let transcript = transcribe_media(ctx, &media, &local_path).await?;
    ctx.store.put_transcript(&transcript).await?;

    media.apply(MediaUpdate::status(MediaStatus::Ready));
    ctx.store.put_media(&media).await?;

    info!(
        media_id = %media_id,
        frames_total = frame_counts.0,
        frames_completed = frame_counts.1,
        frames_failed = frame_counts.2,
        scenes = scenes.len(),
        transcript_segments = transcript.segment_count,
        "media analysis complete"
    );

    Ok(AnalysisReport {
        media,
        frame_counts,
        scene_count: scenes.len(),
        transcript_segments: transcript.segment_count,
    })
}

/// Sample frames and caption them concurrently.
///
/// Returns `(total, completed, failed)` over all frame rows of the
/// media, pre-existing rows included.
async fn caption_frames(
    ctx: &WorkerContext,
    job: &IngestMediaJob,
    local_path: &std::path::Path,
) -> WorkerResult<(usize, usize, usize)> {
    let media_id = &job.media_id;
    let frames_dir = ctx.layout.temp_dir(media_id.as_str()).join("frames");
    let sampled = sample_frames(local_path, &frames_dir, job.granularity_seconds).await?;

    let existing: BTreeSet<u32> = ctx
        .store
        .get_frames(media_id)
        .await?
        .iter()
        .map(|f| f.frame_number)
        .collect();

    let vision = Arc::new(ctx.vision()?);
    let store: JobStore = ctx.store.clone();
    let semaphore = Arc::new(Semaphore::new(ctx.config.max_caption_parallel));
    let prompt = Arc::new(job.caption_prompt.clone());

    let mut tasks: JoinSet<()> = JoinSet::new();
    for frame in &sampled {
        if existing.contains(&frame.frame_number) {
            continue;
        }

        let vision = Arc::clone(&vision);
        let store = store.clone();
        let semaphore = Arc::clone(&semaphore);
        let prompt = Arc::clone(&prompt);
        let media_id = media_id.clone();
        let frame_number = frame.frame_number;
        let timestamp = frame.timestamp_seconds;
        let path = frame.path.clone();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            let record = FrameRecord::pending(media_id, frame_number, timestamp);

            let record = match frame_data_url(&path).await {
                Ok(data_url) => {
                    match vision.caption(ImageInput::DataUrl(data_url), &prompt).await {
                        Ok(caption) => record.complete(caption.text),
                        Err(e) => {
                            warn!("frame {frame_number} captioning failed: {e}");
                            record.fail(e.to_string())
                        }
                    }
                }
                Err(e) => record.fail(e.to_string()),
            };

            if let Err(e) = store.put_frame(&record).await {
                warn!("failed to persist frame {frame_number}: {e}");
            }
        });
    }

    while tasks.join_next().await.is_some() {}

    let all = ctx.store.get_frames(media_id).await?;
    let completed = all.iter().filter(|f| f.is_usable()).count();
    let failed = all
        .iter()
        .filter(|f| f.status == recut_models::FrameStatus::Failed)
        .count();
    Ok((all.len(), completed, failed))
}

async fn transcribe_media(
    ctx: &WorkerContext,
    media: &MediaDescriptor,
    local_path: &std::path::Path,
) -> WorkerResult<Transcript> {
    if !media.has_audio {
        return Ok(Transcript::empty(media.id.clone()));
    }
    let Some(client) = ctx.transcription() else {
        return Ok(Transcript::empty(media.id.clone()));
    };

    let media_dir = ctx.layout.temp_dir(media.id.as_str());
    let audio_path = audio::extract_audio(local_path, &media_dir).await?;
    let result = client
        .transcribe(&audio_path, None)
        .await
        .map_err(crate::error::WorkerError::from)?;

    Ok(Transcript::new(
        media.id.clone(),
        result.segments,
        result.language,
    ))
}

/// Force scene records into start order with `end` equal to the next
/// scene's start (or the media duration).
fn normalize_scene_bounds(mut scenes: Vec<SceneRecord>, duration: f64) -> Vec<SceneRecord> {
    scenes.sort_by(|a, b| a.start.total_cmp(&b.start));
    let starts: Vec<f64> = scenes.iter().map(|s| s.start).collect();
    for (i, scene) in scenes.iter_mut().enumerate() {
        scene.index = i as u32;
        scene.end = starts.get(i + 1).copied().unwrap_or(duration);
    }
    scenes
}

/// Uniform partition used when no scene capability is configured.
///
/// Each scene borrows the caption of the first usable frame inside it.
fn time_based_scenes(
    media_id: recut_models::MediaId,
    duration: f64,
    interval: f64,
    frames: &[FrameRecord],
) -> Vec<SceneRecord> {
    if duration <= 0.0 || interval <= 0.0 {
        return Vec::new();
    }

    let mut scenes = Vec::new();
    let mut start = 0.0;
    let mut index = 0;
    while start < duration {
        let end = (start + interval).min(duration);
        let caption = frames
            .iter()
            .find(|f| f.is_usable() && f.timestamp_seconds >= start && f.timestamp_seconds < end)
            .and_then(|f| f.caption.clone())
            .unwrap_or_default();
        scenes.push(SceneRecord {
            media_id: media_id.clone(),
            index,
            start,
            end,
            caption,
            metadata: Default::default(),
        });
        index += 1;
        start = end;
    }
    scenes
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::MediaId;

    fn scene(start: f64, end: f64) -> SceneRecord {
        SceneRecord {
            media_id: MediaId::from_string("m1"),
            index: 0,
            start,
            end,
            caption: String::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_normalize_scene_bounds_closes_gaps() {
        let scenes = vec![scene(20.0, 21.0), scene(0.0, 5.0), scene(10.0, 12.0)];
        let normalized = normalize_scene_bounds(scenes, 38.0);

        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized[0].start, 0.0);
        assert_eq!(normalized[0].end, 10.0);
        assert_eq!(normalized[1].end, 20.0);
        // Last scene extends to the media duration.
        assert_eq!(normalized[2].end, 38.0);
        assert_eq!(normalized[2].index, 2);
        assert!(recut_models::scene::scenes_are_monotone(&normalized));
    }

    #[test]
    fn test_time_based_partition_covers_duration() {
        let scenes = time_based_scenes(MediaId::from_string("m1"), 75.0, 30.0, &[]);
        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[0].end, 30.0);
        assert_eq!(scenes[2].start, 60.0);
        assert_eq!(scenes[2].end, 75.0);
        assert!(recut_models::scene::scenes_are_monotone(&scenes));
    }

    #[test]
    fn test_time_based_partition_borrows_frame_captions() {
        let frames = vec![
            FrameRecord::pending(MediaId::from_string("m1"), 0, 2.0).complete("a beach"),
            FrameRecord::pending(MediaId::from_string("m1"), 1, 32.0).complete("a boat"),
        ];
        let scenes = time_based_scenes(MediaId::from_string("m1"), 60.0, 30.0, &frames);
        assert_eq!(scenes[0].caption, "a beach");
        assert_eq!(scenes[1].caption, "a boat");
    }

    #[test]
    fn test_time_based_partition_empty_for_degenerate_input() {
        assert!(time_based_scenes(MediaId::from_string("m1"), 0.0, 30.0, &[]).is_empty());
        assert!(time_based_scenes(MediaId::from_string("m1"), 10.0, 0.0, &[]).is_empty());
    }
}
