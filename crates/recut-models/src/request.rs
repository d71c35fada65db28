//! Normalized edit-request descriptor.
//!
//! The HTTP layer marshals incoming payloads into this shape; the
//! queue and worker consume it verbatim.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aspect::AspectRatio;
use crate::intent::StoryIntent;

/// Per-frame description supplied with a request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameData {
    #[serde(alias = "timestamp_seconds")]
    pub frame_timestamp: f64,
    #[serde(alias = "llm_response")]
    pub description: String,
}

/// Per-scene description supplied with a request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneData {
    pub start: f64,
    pub end: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One transcript segment supplied with a request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegmentData {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Transcription block supplied with a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,
    #[serde(default)]
    pub transcript_data: Vec<TranscriptSegmentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Complete description corpus for one source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoData {
    pub video_id: String,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub frames: Vec<FrameData>,
    #[serde(default)]
    pub scenes: Vec<SceneData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<TranscriptionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl VideoData {
    /// Declared duration, or the last scene end when absent.
    pub fn effective_duration(&self) -> f64 {
        match self.duration_seconds {
            Some(d) if d > 0.0 => d,
            _ => self
                .scenes
                .iter()
                .map(|s| s.end)
                .fold(0.0_f64, f64::max),
        }
    }
}

/// A fully normalized edit request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditRequest {
    pub videos_data: Vec<VideoData>,
    #[serde(default)]
    pub summary: serde_json::Value,
    #[serde(default)]
    pub story_prompt: StoryIntent,
    #[serde(default = "default_auto_apply")]
    pub auto_apply: bool,
    #[serde(default = "default_aspect_ratios")]
    pub aspect_ratios: Vec<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<serde_json::Value>,
}

fn default_auto_apply() -> bool {
    true
}

fn default_aspect_ratios() -> Vec<AspectRatio> {
    vec![AspectRatio::Wide]
}

impl EditRequest {
    pub fn is_multi_video(&self) -> bool {
        self.videos_data.len() > 1
    }

    pub fn total_duration(&self) -> f64 {
        self.videos_data.iter().map(VideoData::effective_duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_falls_back_to_scenes() {
        let video: VideoData = serde_json::from_value(serde_json::json!({
            "video_id": "a",
            "video_url": "https://cdn.example.com/a.mp4",
            "scenes": [
                {"start": 0.0, "end": 12.0, "description": "intro"},
                {"start": 12.0, "end": 38.0, "description": "main"}
            ]
        }))
        .unwrap();
        assert_eq!(video.effective_duration(), 38.0);
    }

    #[test]
    fn test_frame_field_aliases() {
        let frame: FrameData = serde_json::from_value(serde_json::json!({
            "timestamp_seconds": 3.0,
            "llm_response": "a dog"
        }))
        .unwrap();
        assert_eq!(frame.frame_timestamp, 3.0);
        assert_eq!(frame.description, "a dog");
    }

    #[test]
    fn test_request_defaults() {
        let request: EditRequest = serde_json::from_value(serde_json::json!({
            "videos_data": [{"video_id": "a", "video_url": "u"}]
        }))
        .unwrap();
        assert!(request.auto_apply);
        assert_eq!(request.aspect_ratios, vec![AspectRatio::Wide]);
        assert!(!request.is_multi_video());
    }
}
