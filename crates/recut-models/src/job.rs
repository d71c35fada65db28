//! Durable job records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Errors stored on a job record are truncated to this length.
pub const MAX_ERROR_LEN: usize = 500;

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Download + analyze one media item
    Ingest,
    /// Produce an edit plan from analysis data
    Generate,
    /// Render an existing plan
    Apply,
    /// Full generate -> apply -> upload -> callback chain
    Pipeline,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Ingest => "ingest",
            JobKind::Generate => "generate",
            JobKind::Apply => "apply",
            JobKind::Pipeline => "pipeline",
        }
    }
}

/// Job state. Transitions are monotone:
/// queued -> processing -> {completed, failed}, with at most one
/// terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The persistent record of one job.
///
/// The job store is the single source of truth for job status; all
/// mutations go through it with last-writer-wins semantics. Handlers
/// check state before mutating so re-delivery stays idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    #[serde(default)]
    pub state: JobState,

    /// Snapshot of the request that created this job
    #[serde(default)]
    pub input: serde_json::Value,

    /// Stage the worker is currently in (pipeline jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,

    /// Rendered output files, keyed by aspect-ratio label
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub output_paths: std::collections::BTreeMap<String, String>,

    /// Uploaded output URLs, keyed by aspect-ratio label
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub output_urls: std::collections::BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub retry_count: u32,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(id: JobId, kind: JobKind, input: serde_json::Value) -> Self {
        Self {
            id,
            kind,
            state: JobState::Queued,
            input,
            current_stage: None,
            output_paths: Default::default(),
            output_urls: Default::default(),
            error: None,
            retry_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Move to `processing`. A no-op on terminal records.
    pub fn start(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Processing;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        true
    }

    /// Terminal success. Refused once the record is already terminal.
    pub fn complete(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Completed;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Terminal failure with a truncated error string.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let mut error = error.into();
        error.truncate(MAX_ERROR_LEN);
        self.state = JobState::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) {
        self.current_stage = Some(stage.into());
    }
}
