//! Edit plans and their Edit Decision Lists.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{MediaId, PlanId};

/// Hard ceiling on the final edit duration in seconds.
pub const FINAL_EDIT_CEILING_SECS: f64 = 40.0;

/// Minimum useful segment duration in seconds.
pub const MIN_SEGMENT_SECS: f64 = 0.1;

/// Segment classification in the agent's EDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    #[default]
    Keep,
    Skip,
    Transition,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Keep => "keep",
            SegmentKind::Skip => "skip",
            SegmentKind::Transition => "transition",
        }
    }
}

/// One segment of the agent EDL.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EdlSegment {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "type", default)]
    pub kind: SegmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
    /// Source video; required when the plan spans multiple sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<MediaId>,
}

impl EdlSegment {
    pub fn keep(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            kind: SegmentKind::Keep,
            reason: None,
            transition_type: None,
            transition_duration: None,
            video_id: None,
        }
    }

    pub fn with_video(mut self, video_id: MediaId) -> Self {
        self.video_id = Some(video_id);
        self
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Key narrative timestamps identified by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoryAnalysis {
    pub hook_timestamp: f64,
    pub climax_timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_timestamp: Option<f64>,
}

/// An important moment with its narrative role.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeyMoment {
    pub start: f64,
    pub end: f64,
    pub importance: String,
    #[serde(default)]
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_role: Option<String>,
}

/// A styled transition between two timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transition {
    pub from_timestamp: f64,
    pub to_timestamp: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: f64,
}

/// How far the input inventory was compressed for the LLM context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompressionStats {
    pub total_frames: usize,
    pub total_scenes: usize,
    pub total_segments: usize,
    pub compressed_frames: usize,
    pub compressed_scenes: usize,
    pub compressed_segments: usize,
    pub frame_compression_ratio: f64,
    pub scene_compression_ratio: f64,
    pub transcript_compression_ratio: f64,
}

/// Token accounting for one LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// A generated, validated edit plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditPlan {
    pub id: PlanId,
    pub edl: Vec<EdlSegment>,
    pub story_analysis: StoryAnalysis,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
    #[serde(default)]
    pub compression: CompressionStats,
    /// Validation output; `warning:`-prefixed entries are advisory.
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub validation_passed: bool,
    #[serde(default)]
    pub llm_usage: TokenUsage,
    pub created_at: DateTime<Utc>,
}

impl EditPlan {
    /// Sum of keep-segment durations.
    pub fn keep_coverage_seconds(&self) -> f64 {
        self.edl
            .iter()
            .filter(|s| s.kind == SegmentKind::Keep)
            .map(EdlSegment::duration)
            .sum()
    }
}

/// One segment in renderer form: keep-only, source-tagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSegment {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<MediaId>,
}

impl RenderSegment {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            video_id: None,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Target duration for an edit.
///
/// `duration * pct / 100`, floored at 20 s for sources longer than
/// 20 s (0.6 x duration otherwise) and capped at the 40 s short-form
/// ceiling.
pub fn target_duration(source_duration: f64, length_percentage: f64) -> f64 {
    let minimum = if source_duration > 20.0 {
        20.0
    } else {
        0.6 * source_duration
    };
    (source_duration * length_percentage / 100.0)
        .max(minimum)
        .min(FINAL_EDIT_CEILING_SECS)
}
