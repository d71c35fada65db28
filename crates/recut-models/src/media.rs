//! Media descriptors: identity, location and derived technical facts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::MediaId;

/// Kind of source media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Video,
    Image,
    Audio,
}

/// Lifecycle status of a media item.
///
/// Media rows are never deleted; `Archived` is the soft-delete
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    #[default]
    Pending,
    Uploading,
    Processing,
    Ready,
    Failed,
    Archived,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Uploading => "uploading",
            MediaStatus::Processing => "processing",
            MediaStatus::Ready => "ready",
            MediaStatus::Failed => "failed",
            MediaStatus::Archived => "archived",
        }
    }
}

/// A source media item: identity + location + probed facts.
///
/// Created when the system first observes a source; the analysis
/// pipeline fills in the probed fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MediaDescriptor {
    /// Globally unique media ID
    pub id: MediaId,

    /// Canonical source URL
    pub source_url: String,

    /// Local path once downloaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,

    /// Media kind
    #[serde(default)]
    pub kind: MediaKind,

    /// Duration in seconds
    #[serde(default)]
    pub duration_seconds: f64,

    /// Frame rate
    #[serde(default)]
    pub fps: f64,

    /// Width in pixels
    #[serde(default)]
    pub width: u32,

    /// Height in pixels
    #[serde(default)]
    pub height: u32,

    /// Video codec name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,

    /// Audio codec name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,

    /// Whether the media carries an audio stream
    #[serde(default)]
    pub has_audio: bool,

    /// Bitrate in kbps
    #[serde(default)]
    pub bitrate_kbps: u64,

    /// GCD-reduced aspect ratio, e.g. "16:9"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// MD5 of the file bytes, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    /// Lifecycle status
    #[serde(default)]
    pub status: MediaStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl MediaDescriptor {
    /// Register a newly observed source.
    pub fn new(id: MediaId, source_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_url: source_url.into(),
            local_path: None,
            kind: MediaKind::Video,
            duration_seconds: 0.0,
            fps: 0.0,
            width: 0,
            height: 0,
            video_codec: None,
            audio_codec: None,
            has_audio: false,
            bitrate_kbps: 0,
            aspect_ratio: None,
            md5: None,
            status: MediaStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update, bumping the `updated_at` timestamp.
    pub fn apply(&mut self, update: MediaUpdate) {
        if let Some(path) = update.local_path {
            self.local_path = Some(path);
        }
        if let Some(duration) = update.duration_seconds {
            self.duration_seconds = duration;
        }
        if let Some(fps) = update.fps {
            self.fps = fps;
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(codec) = update.video_codec {
            self.video_codec = Some(codec);
        }
        if let Some(codec) = update.audio_codec {
            self.audio_codec = Some(codec);
        }
        if let Some(has_audio) = update.has_audio {
            self.has_audio = has_audio;
        }
        if let Some(bitrate) = update.bitrate_kbps {
            self.bitrate_kbps = bitrate;
        }
        if let Some(ar) = update.aspect_ratio {
            self.aspect_ratio = Some(ar);
        }
        if let Some(md5) = update.md5 {
            self.md5 = Some(md5);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update for a media descriptor.
///
/// Explicit nullable fields instead of dynamic kwargs: unknown fields
/// are a compile-time error at the call site.
#[derive(Debug, Clone, Default)]
pub struct MediaUpdate {
    pub local_path: Option<String>,
    pub duration_seconds: Option<f64>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub has_audio: Option<bool>,
    pub bitrate_kbps: Option<u64>,
    pub aspect_ratio: Option<String>,
    pub md5: Option<String>,
    pub status: Option<MediaStatus>,
}

impl MediaUpdate {
    pub fn status(status: MediaStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_update_is_partial() {
        let mut media = MediaDescriptor::new(MediaId::from_string("m1"), "https://example.com/a.mp4");
        media.apply(MediaUpdate {
            duration_seconds: Some(38.0),
            has_audio: Some(true),
            ..Default::default()
        });

        assert_eq!(media.duration_seconds, 38.0);
        assert!(media.has_audio);
        // Untouched fields keep their values.
        assert_eq!(media.status, MediaStatus::Pending);
        assert!(media.local_path.is_none());
    }

    #[test]
    fn test_media_status_update() {
        let mut media = MediaDescriptor::new(MediaId::new(), "file:///tmp/a.mp4");
        media.apply(MediaUpdate::status(MediaStatus::Ready));
        assert_eq!(media.status, MediaStatus::Ready);
        assert_eq!(media.status.as_str(), "ready");
    }
}
