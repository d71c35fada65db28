//! EDL renderer: segment extraction, concatenation, captions and
//! audio normalization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use recut_models::{
    AspectRatio, EncodingConfig, MediaId, RenderSegment, Transcript, MIN_SEGMENT_SECS,
};

use crate::captions::{burn_in_filter, remap_cues, write_srt};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::aspect_filter;
use crate::fs_utils::ensure_dir;
use crate::probe::probe_media;

/// EBU R128 loudness normalization used for every rendered output.
const LOUDNORM_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// One render source.
#[derive(Debug, Clone)]
pub struct RenderInput {
    pub media_id: MediaId,
    /// Primary source handed to ffmpeg (local path or URL)
    pub source: String,
    /// Locally cached copy used as a one-shot fallback when the
    /// primary source is a URL and extraction fails
    pub cached_copy: Option<PathBuf>,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub transcript: Option<Transcript>,
}

/// Renderer knobs.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub encoding: EncodingConfig,
    /// Burn captions in when a transcript is available
    pub captions: bool,
    /// Per-subprocess timeout
    pub segment_timeout_secs: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            captions: true,
            segment_timeout_secs: 600,
        }
    }
}

/// Renders a converted EDL into one MP4 per aspect ratio.
pub struct Renderer {
    work_dir: PathBuf,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(work_dir: impl AsRef<Path>, options: RenderOptions) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            options,
        }
    }

    /// Render `edl` against `inputs` into `output` for one aspect ratio.
    ///
    /// Segments are extracted in EDL order (multi-video EDLs intermix
    /// sources), concatenated via the concat demuxer, loudness
    /// normalized when audio is present and muxed with faststart. Any
    /// failing segment fails the render; there is no partial output.
    pub async fn render(
        &self,
        inputs: &[RenderInput],
        edl: &[RenderSegment],
        aspect: AspectRatio,
        output: impl AsRef<Path>,
    ) -> MediaResult<PathBuf> {
        let output = output.as_ref();
        let by_id: BTreeMap<&MediaId, &RenderInput> =
            inputs.iter().map(|i| (&i.media_id, i)).collect();

        let valid = validate_segments(edl, inputs, &by_id)?;

        let work = self.work_dir.join(format!("render_{}", aspect.as_label()));
        ensure_dir(&work).await?;
        if let Some(parent) = output.parent() {
            ensure_dir(parent).await?;
        }

        // Extract each segment re-encoded with the target profile.
        let mut segment_paths = Vec::with_capacity(valid.len());
        for (i, segment) in valid.iter().enumerate() {
            let input = resolve_input(segment, inputs, &by_id);
            let seg_path = work.join(format!("seg_{i:04}.mp4"));
            self.extract_segment(input, segment, aspect, &seg_path)
                .await?;
            segment_paths.push(seg_path);
        }

        // Concat list in EDL order.
        let concat_path = work.join("concat.txt");
        tokio::fs::write(&concat_path, concat_list_contents(&segment_paths)).await?;

        // Audio decisions follow the first extracted segment.
        let has_audio = match probe_media(&segment_paths[0]).await {
            Ok(info) => info.has_audio,
            Err(e) => {
                warn!("could not probe first segment for audio: {e}");
                false
            }
        };

        // Captions: remap transcript segments into the output timeline.
        let srt_path = if self.options.captions {
            let windows: Vec<(RenderSegment, &[recut_models::TranscriptSegment])> = valid
                .iter()
                .map(|segment| {
                    let input = resolve_input(segment, inputs, &by_id);
                    let segments = input
                        .transcript
                        .as_ref()
                        .map(|t| t.segments.as_slice())
                        .unwrap_or(&[]);
                    (segment.clone(), segments)
                })
                .collect();
            let cues = remap_cues(&windows);
            if cues.is_empty() {
                // Transcript absent: captions are silently disabled.
                None
            } else {
                let path = work.join("captions.srt");
                write_srt(&cues, &path).await?;
                Some(path)
            }
        } else {
            None
        };

        let mut cmd = FfmpegCommand::to_output(output)
            .input(&concat_path)
            .input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
            .video_codec(&self.options.encoding.codec)
            .preset(&self.options.encoding.preset)
            .crf(self.options.encoding.crf);

        if let Some(srt) = &srt_path {
            cmd = cmd.video_filter(burn_in_filter(srt));
        }

        if has_audio {
            cmd = cmd
                .audio_codec(&self.options.encoding.audio_codec)
                .audio_bitrate(&self.options.encoding.audio_bitrate)
                .audio_filter(LOUDNORM_FILTER);
        } else {
            info!("rendering video-only output (no audio stream)");
            cmd = cmd.no_audio();
        }

        cmd = cmd.faststart();

        FfmpegRunner::new()
            .with_timeout(self.options.segment_timeout_secs)
            .run(&cmd)
            .await?;

        if !output.exists() {
            return Err(MediaError::render_failed(format!(
                "ffmpeg produced no output at {}",
                output.display()
            )));
        }

        info!(
            "rendered {} segments into {} ({})",
            valid.len(),
            output.display(),
            aspect
        );
        Ok(output.to_path_buf())
    }

    async fn extract_segment(
        &self,
        input: &RenderInput,
        segment: &RenderSegment,
        aspect: AspectRatio,
        seg_path: &Path,
    ) -> MediaResult<()> {
        let result = self
            .run_extract(&input.source, input, segment, aspect, seg_path)
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                // URL sources get one retry against the cached copy.
                let is_url = input.source.starts_with("http://")
                    || input.source.starts_with("https://");
                if let (true, Some(cached)) = (is_url, &input.cached_copy) {
                    warn!(
                        "segment extraction from {} failed ({e}), retrying against cached copy",
                        input.source
                    );
                    let cached = cached.to_string_lossy().into_owned();
                    self.run_extract(&cached, input, segment, aspect, seg_path)
                        .await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn run_extract(
        &self,
        source: &str,
        input: &RenderInput,
        segment: &RenderSegment,
        aspect: AspectRatio,
        seg_path: &Path,
    ) -> MediaResult<()> {
        let mut cmd = FfmpegCommand::new(source, seg_path)
            .seek(segment.start)
            .duration(segment.duration())
            .video_codec(&self.options.encoding.codec)
            .preset(&self.options.encoding.preset)
            .crf(self.options.encoding.crf)
            .audio_codec(&self.options.encoding.audio_codec)
            .audio_bitrate(&self.options.encoding.audio_bitrate);

        if let Some(filter) = aspect_filter(aspect, input.width, input.height) {
            cmd = cmd.video_filter(filter);
        }

        FfmpegRunner::new()
            .with_timeout(self.options.segment_timeout_secs)
            .run(&cmd)
            .await
    }
}

fn resolve_input<'a>(
    segment: &RenderSegment,
    inputs: &'a [RenderInput],
    by_id: &BTreeMap<&MediaId, &'a RenderInput>,
) -> &'a RenderInput {
    segment
        .video_id
        .as_ref()
        .and_then(|id| by_id.get(id).copied())
        .unwrap_or(&inputs[0])
}

/// Validate the EDL against the inputs.
///
/// Out-of-range segments are rejected; segments shorter than the
/// minimum are dropped with a warning. An EDL with nothing left to
/// render is an error.
fn validate_segments(
    edl: &[RenderSegment],
    inputs: &[RenderInput],
    by_id: &BTreeMap<&MediaId, &RenderInput>,
) -> MediaResult<Vec<RenderSegment>> {
    if inputs.is_empty() {
        return Err(MediaError::render_failed("no render inputs"));
    }
    if edl.is_empty() {
        return Err(MediaError::EmptyEdl);
    }

    let mut valid = Vec::with_capacity(edl.len());
    for segment in edl {
        if let Some(id) = &segment.video_id {
            if !by_id.contains_key(id) {
                return Err(MediaError::render_failed(format!(
                    "segment references unknown video {id}"
                )));
            }
        }
        let input = resolve_input(segment, inputs, by_id);

        if segment.start < 0.0 || segment.end > input.duration || segment.start >= segment.end {
            return Err(MediaError::render_failed(format!(
                "segment {:.2}-{:.2} outside [0, {:.2}] for {}",
                segment.start, segment.end, input.duration, input.media_id
            )));
        }
        if segment.duration() < MIN_SEGMENT_SECS {
            warn!(
                "dropping {:.3}s segment at {:.2}s (below {MIN_SEGMENT_SECS}s minimum)",
                segment.duration(),
                segment.start
            );
            continue;
        }
        valid.push(segment.clone());
    }

    if valid.is_empty() {
        return Err(MediaError::EmptyEdl);
    }
    Ok(valid)
}

/// Concat-demuxer list: one `file` directive per segment, EDL order.
fn concat_list_contents(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, duration: f64) -> RenderInput {
        RenderInput {
            media_id: MediaId::from_string(id),
            source: format!("/tmp/{id}.mp4"),
            cached_copy: None,
            duration,
            width: 1920,
            height: 1080,
            transcript: None,
        }
    }

    fn by_id(inputs: &[RenderInput]) -> BTreeMap<&MediaId, &RenderInput> {
        inputs.iter().map(|i| (&i.media_id, i)).collect()
    }

    #[test]
    fn test_empty_edl_is_rejected() {
        let inputs = vec![input("a", 38.0)];
        let err = validate_segments(&[], &inputs, &by_id(&inputs)).unwrap_err();
        assert!(matches!(err, MediaError::EmptyEdl));
    }

    #[test]
    fn test_out_of_range_segment_is_rejected() {
        let inputs = vec![input("a", 38.0)];
        let edl = vec![RenderSegment::new(30.0, 45.0)];
        let err = validate_segments(&edl, &inputs, &by_id(&inputs)).unwrap_err();
        assert!(matches!(err, MediaError::RenderFailed(_)));
    }

    #[test]
    fn test_short_segments_dropped_not_fatal() {
        let inputs = vec![input("a", 38.0)];
        let edl = vec![
            RenderSegment::new(0.0, 2.0),
            RenderSegment::new(5.0, 5.05),
            RenderSegment::new(10.0, 12.0),
        ];
        let valid = validate_segments(&edl, &inputs, &by_id(&inputs)).unwrap();
        assert_eq!(valid.len(), 2);
    }

    #[test]
    fn test_all_segments_too_short_is_empty_edl() {
        let inputs = vec![input("a", 38.0)];
        let edl = vec![RenderSegment::new(0.0, 0.05)];
        let err = validate_segments(&edl, &inputs, &by_id(&inputs)).unwrap_err();
        assert!(matches!(err, MediaError::EmptyEdl));
    }

    #[test]
    fn test_unknown_video_id_is_rejected() {
        let inputs = vec![input("a", 38.0)];
        let mut seg = RenderSegment::new(0.0, 2.0);
        seg.video_id = Some(MediaId::from_string("b"));
        let err = validate_segments(&[seg], &inputs, &by_id(&inputs)).unwrap_err();
        assert!(matches!(err, MediaError::RenderFailed(_)));
    }

    #[test]
    fn test_multi_video_segments_resolve_their_sources() {
        let inputs = vec![input("a", 30.0), input("b", 40.0)];
        let map = by_id(&inputs);

        let mut seg_b = RenderSegment::new(35.0, 38.0);
        seg_b.video_id = Some(MediaId::from_string("b"));

        // 35-38s is valid for b (40s) but would be out of range for a (30s).
        let valid = validate_segments(&[seg_b], &inputs, &map).unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(
            resolve_input(&valid[0], &inputs, &map).media_id.as_str(),
            "b"
        );
    }

    #[test]
    fn test_concat_list_preserves_order() {
        let paths = vec![
            PathBuf::from("/w/seg_0000.mp4"),
            PathBuf::from("/w/seg_0001.mp4"),
        ];
        assert_eq!(
            concat_list_contents(&paths),
            "file '/w/seg_0000.mp4'\nfile '/w/seg_0001.mp4'\n"
        );
    }
}
