//! Per-media speech transcripts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::MediaId;

/// Word-level timing, preserved when the transcription capability
/// returns it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// One transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_logprob: Option<f64>,
}

/// Ordered transcript of one media.
///
/// Invariant over segments: `start_i < end_i <= start_{i+1}`.
/// An empty transcript (`segment_count == 0`) is a valid completed
/// state: it means the media carries no spoken audio.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub media_id: MediaId,
    pub segments: Vec<TranscriptSegment>,
    /// Full concatenated text
    pub full_text: String,
    /// BCP-47 language tag
    pub language: String,
    pub segment_count: usize,
}

impl Transcript {
    pub fn new(media_id: MediaId, segments: Vec<TranscriptSegment>, language: impl Into<String>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let segment_count = segments.len();
        Self {
            media_id,
            segments,
            full_text,
            language: language.into(),
            segment_count,
        }
    }

    /// Empty transcript for media with no spoken audio.
    pub fn empty(media_id: MediaId) -> Self {
        Self::new(media_id, Vec::new(), "en")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check segment ordering: `start < end <= next.start`.
    pub fn is_ordered(&self) -> bool {
        self.segments.iter().all(|s| s.start < s.end)
            && self
                .segments
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].start + f64::EPSILON)
    }
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
    fn test_full_text_concatenation() {
        let t = Transcript::new(
            MediaId::from_string("m1"),
            vec![seg(0.0, 2.0, " hello "), seg(2.0, 4.0, "world")],
            "en",
        );
        assert_eq!(t.full_text, "hello world");
        assert_eq!(t.segment_count, 2);
        assert!(t.is_ordered());
    }

    #[test]
    fn test_empty_transcript_is_valid() {
        let t = Transcript::empty(MediaId::from_string("m1"));
        assert!(t.is_empty());
        assert_eq!(t.segment_count, 0);
        assert_eq!(t.language, "en");
        assert!(t.is_ordered());
    }

    #[test]
    fn test_out_of_order_segments_detected() {
        let t = Transcript::new(
            MediaId::from_string("m1"),
            vec![seg(0.0, 3.0, "a"), seg(2.0, 4.0, "b")],
            "en",
        );
        assert!(!t.is_ordered());
    }
}
