//! Frame records: one caption per sampled frame.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::MediaId;

/// Per-frame captioning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// Caption of one sampled frame.
///
/// Unique on `(media_id, frame_number)`; immutable once completed.
/// A failed caption is a value on the record, not an error of the
/// enclosing analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameRecord {
    /// Owning media
    pub media_id: MediaId,

    /// Monotonic frame number within the media
    pub frame_number: u32,

    /// Timestamp of the frame in the source
    pub timestamp_seconds: f64,

    /// Caption text from the vision capability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Captioning status
    #[serde(default)]
    pub status: FrameStatus,

    /// Error string when captioning failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl FrameRecord {
    pub fn pending(media_id: MediaId, frame_number: u32, timestamp_seconds: f64) -> Self {
        Self {
            media_id,
            frame_number,
            timestamp_seconds,
            caption: None,
            status: FrameStatus::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn complete(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self.status = FrameStatus::Completed;
        self.error = None;
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = FrameStatus::Failed;
        self.error = Some(error.into());
        self
    }

    /// Whether this frame should be fed to the agent.
    pub fn is_usable(&self) -> bool {
        self.status == FrameStatus::Completed
            && self.caption.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lifecycle() {
        let frame = FrameRecord::pending(MediaId::from_string("m1"), 3, 3.0);
        assert_eq!(frame.status, FrameStatus::Pending);
        assert!(!frame.is_usable());

        let done = frame.clone().complete("a person waving");
        assert!(done.is_usable());

        let failed = frame.fail("vision call timed out");
        assert_eq!(failed.status, FrameStatus::Failed);
        assert!(!failed.is_usable());
        assert!(failed.error.is_some());
    }
}
