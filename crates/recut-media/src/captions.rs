//! SRT caption generation and burn-in.

use std::path::Path;

use recut_models::{RenderSegment, TranscriptSegment};

use crate::error::MediaResult;

/// Subtitle style used for burn-in.
const BURN_IN_STYLE: &str =
    "FontSize=24,PrimaryColour=&Hffffff,OutlineColour=&H000000,Outline=2";

/// One subtitle cue on the output timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Remap transcript segments into the output timeline of the
/// surviving keep windows.
///
/// `windows` pairs each EDL window (in concat order) with the
/// transcript of its source video. Segments overlapping a window are
/// clipped to it and shifted by the cumulative output offset.
pub fn remap_cues(windows: &[(RenderSegment, &[TranscriptSegment])]) -> Vec<SrtCue> {
    let mut cues = Vec::new();
    let mut offset = 0.0;

    for (window, segments) in windows {
        for seg in *segments {
            let clipped_start = seg.start.max(window.start);
            let clipped_end = seg.end.min(window.end);
            if clipped_end <= clipped_start {
                continue;
            }
            let text = seg.text.trim();
            if text.is_empty() {
                continue;
            }
            cues.push(SrtCue {
                start: offset + clipped_start - window.start,
                end: offset + clipped_end - window.start,
                text: text.to_string(),
            });
        }
        offset += window.duration();
    }

    cues
}

/// Write cues as an SRT file.
pub async fn write_srt(cues: &[SrtCue], path: impl AsRef<Path>) -> MediaResult<()> {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(cue.start),
            format_srt_time(cue.end),
            cue.text
        ));
    }
    tokio::fs::write(path.as_ref(), out).await?;
    Ok(())
}

/// `subtitles` filter string burning `srt_path` in with the fixed style.
pub fn burn_in_filter(srt_path: impl AsRef<Path>) -> String {
    format!(
        "subtitles={}:force_style='{}'",
        srt_path.as_ref().to_string_lossy(),
        BURN_IN_STYLE
    )
}

/// Seconds to SRT time format `HH:MM:SS,mmm`.
fn format_srt_time(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
            speaker: None,
            words: Vec::new(),
            avg_logprob: None,
        }
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(61.5), "00:01:01,500");
        assert_eq!(format_srt_time(3600.025), "01:00:00,025");
    }

    #[test]
    fn test_remap_clips_and_offsets() {
        let transcript = vec![seg(0.0, 3.0, "first"), seg(9.0, 12.0, "second")];
        let windows = vec![
            (RenderSegment::new(1.0, 3.0), transcript.as_slice()),
            (RenderSegment::new(10.0, 12.0), transcript.as_slice()),
        ];

        let cues = remap_cues(&windows);
        assert_eq!(cues.len(), 2);

        // "first" overlaps the first window from 1.0..3.0 -> output 0.0..2.0.
        assert!((cues[0].start - 0.0).abs() < 1e-9);
        assert!((cues[0].end - 2.0).abs() < 1e-9);
        assert_eq!(cues[0].text, "first");

        // "second" overlaps the second window from 10.0..12.0; the
        // first window contributed 2.0s of output.
        assert!((cues[1].start - 2.0).abs() < 1e-9);
        assert!((cues[1].end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_remap_drops_non_overlapping_segments() {
        let transcript = vec![seg(20.0, 25.0, "unused")];
        let windows = vec![(RenderSegment::new(0.0, 5.0), transcript.as_slice())];
        assert!(remap_cues(&windows).is_empty());
    }

    #[tokio::test]
    async fn test_write_srt_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        let cues = vec![SrtCue {
            start: 0.0,
            end: 1.25,
            text: "hello".to_string(),
        }];
        write_srt(&cues, &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "1\n00:00:00,000 --> 00:00:01,250\nhello\n\n");
    }

    #[test]
    fn test_burn_in_filter_carries_style() {
        let filter = burn_in_filter("/tmp/captions.srt");
        assert!(filter.starts_with("subtitles=/tmp/captions.srt"));
        assert!(filter.contains("FontSize=24"));
        assert!(filter.contains("Outline=2"));
    }
}
