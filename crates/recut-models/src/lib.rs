//! Shared data models for the recut editing service.
//!
//! Everything that crosses a crate boundary lives here: media
//! descriptors, analysis records (frames, scenes, transcripts), story
//! intent, edit plans and their EDLs, and the durable job record.

pub mod aspect;
pub mod frame;
pub mod ids;
pub mod intent;
pub mod job;
pub mod media;
pub mod plan;
pub mod request;
pub mod scene;
pub mod transcript;

pub use aspect::{AspectRatio, EncodingConfig};
pub use frame::{FrameRecord, FrameStatus};
pub use ids::{JobId, MediaId, PlanId};
pub use intent::{StoryArc, StoryIntent, StylePreferences};
pub use job::{JobKind, JobRecord, JobState, MAX_ERROR_LEN};
pub use media::{MediaDescriptor, MediaKind, MediaStatus, MediaUpdate};
pub use plan::{
    target_duration, CompressionStats, EdlSegment, EditPlan, KeyMoment, RenderSegment,
    SegmentKind, StoryAnalysis, TokenUsage, Transition, FINAL_EDIT_CEILING_SECS,
    MIN_SEGMENT_SECS,
};
pub use request::{
    EditRequest, FrameData, SceneData, TranscriptSegmentData, TranscriptionData, VideoData,
};
pub use scene::SceneRecord;
pub use transcript::{Transcript, TranscriptSegment, WordTiming};
