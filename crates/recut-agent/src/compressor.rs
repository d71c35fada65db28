//! Inventory compression for the LLM context.
//!
//! Bounds the prompt regardless of input size while preserving
//! information density: frames are sampled across time with the first
//! and last always kept, scenes keep the longest, transcripts
//! subsample uniformly.

use tracing::debug;

use recut_models::{CompressionStats, FrameRecord, SceneRecord, TranscriptSegment};

/// Frame selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameStrategy {
    #[default]
    TemporalSampling,
    /// Longer captions first (caption length as an importance proxy)
    ImportanceBased,
    /// Proxies to temporal sampling
    SceneBased,
}

/// Scene selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneStrategy {
    #[default]
    All,
    /// Longest scenes by duration
    KeyMoments,
}

/// Transcript selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptStrategy {
    #[default]
    Temporal,
    /// Most-worded segments first
    Density,
}

/// Compressed inventory plus telemetry.
#[derive(Debug, Clone)]
pub struct CompressedContext {
    pub frames: Vec<FrameRecord>,
    pub scenes: Vec<SceneRecord>,
    pub transcript: Vec<TranscriptSegment>,
    pub stats: CompressionStats,
}

/// Compresses frames, scenes and transcript segments to fixed caps.
#[derive(Debug, Clone)]
pub struct DataCompressor {
    pub max_frames: usize,
    pub max_scenes: usize,
    pub max_transcript_segments: usize,
}

impl Default for DataCompressor {
    fn default() -> Self {
        Self {
            max_frames: 50,
            max_scenes: 20,
            max_transcript_segments: 100,
        }
    }
}

impl DataCompressor {
    /// Compress the full inventory and record compression ratios.
    pub fn summarize(
        &self,
        frames: &[FrameRecord],
        scenes: &[SceneRecord],
        transcript: &[TranscriptSegment],
    ) -> CompressedContext {
        let compressed_frames = self.compress_frames(frames, FrameStrategy::default());
        let compressed_scenes = self.compress_scenes(scenes, SceneStrategy::default());
        let compressed_transcript =
            self.compress_transcript(transcript, TranscriptStrategy::default());

        let ratio = |compressed: usize, original: usize| {
            if original > 0 {
                compressed as f64 / original as f64
            } else {
                1.0
            }
        };

        let stats = CompressionStats {
            total_frames: frames.len(),
            total_scenes: scenes.len(),
            total_segments: transcript.len(),
            compressed_frames: compressed_frames.len(),
            compressed_scenes: compressed_scenes.len(),
            compressed_segments: compressed_transcript.len(),
            frame_compression_ratio: ratio(compressed_frames.len(), frames.len()),
            scene_compression_ratio: ratio(compressed_scenes.len(), scenes.len()),
            transcript_compression_ratio: ratio(compressed_transcript.len(), transcript.len()),
        };

        debug!(
            frames = stats.compressed_frames,
            scenes = stats.compressed_scenes,
            segments = stats.compressed_segments,
            "inventory compressed for LLM context"
        );

        CompressedContext {
            frames: compressed_frames,
            scenes: compressed_scenes,
            transcript: compressed_transcript,
            stats,
        }
    }

    /// Compress frame records.
    ///
    /// Only captioned, non-failed frames are considered. When the
    /// usable set fits the cap it is returned as-is.
    pub fn compress_frames(&self, frames: &[FrameRecord], strategy: FrameStrategy) -> Vec<FrameRecord> {
        let mut usable: Vec<FrameRecord> =
            frames.iter().filter(|f| f.is_usable()).cloned().collect();

        if usable.len() <= self.max_frames {
            usable.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));
            return usable;
        }

        match strategy {
            FrameStrategy::TemporalSampling | FrameStrategy::SceneBased => {
                self.temporal_sampling(usable)
            }
            FrameStrategy::ImportanceBased => {
                usable.sort_by_key(|f| {
                    std::cmp::Reverse(f.caption.as_deref().map(str::len).unwrap_or(0))
                });
                usable.truncate(self.max_frames);
                usable.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));
                usable
            }
        }
    }

    /// Even distribution with first/last emphasis, deduplicated on
    /// timestamps rounded to two decimals.
    fn temporal_sampling(&self, mut frames: Vec<FrameRecord>) -> Vec<FrameRecord> {
        frames.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));

        let target = self.max_frames.min(frames.len());
        let mut selected = vec![frames[0].clone()];
        if frames.len() > 1 {
            selected.push(frames[frames.len() - 1].clone());
        }

        if frames.len() > 2 && target > 2 {
            let step = (frames.len() - 2) as f64 / (target - 2) as f64;
            for i in 1..(target - 1) {
                let idx = 1 + (i as f64 * step) as usize;
                if idx < frames.len() - 1 {
                    selected.push(frames[idx].clone());
                }
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        let mut unique: Vec<FrameRecord> = selected
            .into_iter()
            .filter(|f| seen.insert((f.timestamp_seconds * 100.0).round() as i64))
            .collect();
        unique.sort_by(|a, b| a.timestamp_seconds.total_cmp(&b.timestamp_seconds));
        unique
    }

    /// Compress scene records.
    pub fn compress_scenes(&self, scenes: &[SceneRecord], strategy: SceneStrategy) -> Vec<SceneRecord> {
        if scenes.len() <= self.max_scenes {
            return scenes.to_vec();
        }
        match strategy {
            SceneStrategy::All => scenes[..self.max_scenes].to_vec(),
            SceneStrategy::KeyMoments => {
                let mut sorted = scenes.to_vec();
                sorted.sort_by(|a, b| b.duration().total_cmp(&a.duration()));
                sorted.truncate(self.max_scenes);
                sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
                sorted
            }
        }
    }

    /// Compress transcript segments.
    pub fn compress_transcript(
        &self,
        segments: &[TranscriptSegment],
        strategy: TranscriptStrategy,
    ) -> Vec<TranscriptSegment> {
        if segments.len() <= self.max_transcript_segments {
            return segments.to_vec();
        }
        match strategy {
            TranscriptStrategy::Temporal => {
                let step = segments.len() as f64 / self.max_transcript_segments as f64;
                (0..self.max_transcript_segments)
                    .filter_map(|i| segments.get((i as f64 * step) as usize).cloned())
                    .collect()
            }
            TranscriptStrategy::Density => {
                let mut sorted = segments.to_vec();
                sorted.sort_by_key(|s| std::cmp::Reverse(s.text.split_whitespace().count()));
                sorted.truncate(self.max_transcript_segments);
                sorted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::{FrameStatus, MediaId};

    fn frame(n: u32, ts: f64) -> FrameRecord {
        FrameRecord::pending(MediaId::from_string("m1"), n, ts).complete(format!("caption {n}"))
    }

    fn failed_frame(n: u32, ts: f64) -> FrameRecord {
        FrameRecord::pending(MediaId::from_string("m1"), n, ts).fail("vision error")
    }

    fn seg(start: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end: start + 1.0,
            text: text.to_string(),
            speaker: None,
            words: Vec::new(),
            avg_logprob: None,
        }
    }

    #[test]
    fn test_under_cap_passes_through() {
        let compressor = DataCompressor::default();
        let frames: Vec<_> = (0..10).map(|n| frame(n, n as f64)).collect();
        let out = compressor.compress_frames(&frames, FrameStrategy::TemporalSampling);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_failed_and_uncaptioned_frames_excluded() {
        let compressor = DataCompressor::default();
        let mut frames: Vec<_> = (0..5).map(|n| frame(n, n as f64)).collect();
        frames.push(failed_frame(5, 5.0));
        frames.push(FrameRecord {
            status: FrameStatus::Completed,
            caption: Some(String::new()),
            ..frame(6, 6.0)
        });

        let out = compressor.compress_frames(&frames, FrameStrategy::TemporalSampling);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_temporal_sampling_bounds_and_keeps_endpoints() {
        let compressor = DataCompressor {
            max_frames: 10,
            ..Default::default()
        };
        let frames: Vec<_> = (0..200).map(|n| frame(n, n as f64)).collect();
        let out = compressor.compress_frames(&frames, FrameStrategy::TemporalSampling);

        assert!(out.len() <= 10);
        assert_eq!(out.first().unwrap().frame_number, 0);
        assert_eq!(out.last().unwrap().frame_number, 199);
        // Output is timestamp-sorted.
        assert!(out
            .windows(2)
            .all(|p| p[0].timestamp_seconds <= p[1].timestamp_seconds));
    }

    #[test]
    fn test_temporal_sampling_dedupes_rounded_timestamps() {
        let compressor = DataCompressor {
            max_frames: 3,
            ..Default::default()
        };
        // Two frames round to the same 2dp timestamp.
        let frames = vec![frame(0, 0.001), frame(1, 0.004), frame(2, 5.0), frame(3, 9.0)];
        let out = compressor.compress_frames(&frames, FrameStrategy::TemporalSampling);
        let mut stamps: Vec<i64> = out
            .iter()
            .map(|f| (f.timestamp_seconds * 100.0).round() as i64)
            .collect();
        stamps.dedup();
        assert_eq!(stamps.len(), out.len());
    }

    #[test]
    fn test_importance_based_prefers_longer_captions() {
        let compressor = DataCompressor {
            max_frames: 2,
            ..Default::default()
        };
        let frames = vec![
            frame(0, 0.0).complete("x"),
            frame(1, 1.0).complete("a much longer and more detailed caption"),
            frame(2, 2.0).complete("medium length caption"),
        ];
        let out = compressor.compress_frames(&frames, FrameStrategy::ImportanceBased);
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|f| f.frame_number == 1));
        assert!(out.iter().any(|f| f.frame_number == 2));
    }

    #[test]
    fn test_key_moments_keeps_longest_scenes() {
        let compressor = DataCompressor {
            max_scenes: 2,
            ..Default::default()
        };
        let scenes = vec![
            SceneRecord {
                media_id: MediaId::from_string("m1"),
                index: 0,
                start: 0.0,
                end: 1.0,
                caption: "short".into(),
                metadata: Default::default(),
            },
            SceneRecord {
                media_id: MediaId::from_string("m1"),
                index: 1,
                start: 1.0,
                end: 20.0,
                caption: "long".into(),
                metadata: Default::default(),
            },
            SceneRecord {
                media_id: MediaId::from_string("m1"),
                index: 2,
                start: 20.0,
                end: 30.0,
                caption: "medium".into(),
                metadata: Default::default(),
            },
        ];
        let out = compressor.compress_scenes(&scenes, SceneStrategy::KeyMoments);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].caption, "long");
        assert_eq!(out[1].caption, "medium");
    }

    #[test]
    fn test_transcript_temporal_subsample() {
        let compressor = DataCompressor {
            max_transcript_segments: 10,
            ..Default::default()
        };
        let segments: Vec<_> = (0..100).map(|n| seg(n as f64, "word")).collect();
        let out = compressor.compress_transcript(&segments, TranscriptStrategy::Temporal);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0].start, 0.0);
    }

    #[test]
    fn test_transcript_density_keeps_wordiest() {
        let compressor = DataCompressor {
            max_transcript_segments: 1,
            ..Default::default()
        };
        let segments = vec![seg(0.0, "one"), seg(1.0, "three whole words here")];
        let out = compressor.compress_transcript(&segments, TranscriptStrategy::Density);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "three whole words here");
    }

    #[test]
    fn test_stats_record_ratios() {
        let compressor = DataCompressor {
            max_frames: 5,
            max_scenes: 20,
            max_transcript_segments: 100,
        };
        let frames: Vec<_> = (0..50).map(|n| frame(n, n as f64)).collect();
        let ctx = compressor.summarize(&frames, &[], &[]);

        assert_eq!(ctx.stats.total_frames, 50);
        assert!(ctx.stats.compressed_frames <= 5);
        assert!(ctx.stats.frame_compression_ratio <= 0.1 + 1e-9);
        // Empty inputs report a neutral ratio.
        assert_eq!(ctx.stats.scene_compression_ratio, 1.0);
    }
}
