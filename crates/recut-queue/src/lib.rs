//! Redis Streams job queue and the durable job/plan store.
//!
//! This crate provides:
//! - job enqueueing with idempotency-key dedup
//! - worker consumption with retry counters and a DLQ
//! - crash recovery by claiming stale pending messages
//! - persistence of job records and edit plans

pub mod error;
pub mod job;
pub mod queue;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use job::{ApplyEditJob, GeneratePlanJob, IngestMediaJob, PipelineJob, QueueJob};
pub use queue::{JobQueue, QueueConfig};
pub use store::JobStore;
