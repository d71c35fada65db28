//! Worker error taxonomy.
//!
//! These are the kinds surfaced to callers; errors from the leaf
//! crates are folded into them at the boundary.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("dependency failure: {0}")]
    DependencyFailure(String),

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("render failure: {0}")]
    RenderFailure(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("job cancelled")]
    Cancelled,
}

impl WorkerError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether the job runner should retry this failure.
    ///
    /// Fetch, LLM and subprocess failures are retried; bad input,
    /// missing records, rejected plans and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::Transient(_)
                | WorkerError::DependencyFailure(_)
                | WorkerError::RenderFailure(_)
        )
    }
}

impl From<recut_media::MediaError> for WorkerError {
    fn from(e: recut_media::MediaError) -> Self {
        use recut_media::MediaError;
        match e {
            MediaError::EmptyEdl => WorkerError::ValidationFailure(e.to_string()),
            MediaError::InvalidMedia(_) | MediaError::FileNotFound(_) => {
                WorkerError::InvalidInput(e.to_string())
            }
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => {
                WorkerError::DependencyUnavailable(e.to_string())
            }
            MediaError::FfmpegFailed { .. }
            | MediaError::FfprobeFailed { .. }
            | MediaError::RenderFailed(_)
            | MediaError::Timeout(_) => WorkerError::RenderFailure(e.to_string()),
            MediaError::DownloadFailed { .. }
            | MediaError::Http(_)
            | MediaError::Io(_) => WorkerError::Transient(e.to_string()),
            MediaError::ChecksumMismatch { .. }
            | MediaError::MissingChunk { .. }
            | MediaError::JsonParse(_) => WorkerError::InvalidInput(e.to_string()),
        }
    }
}

impl From<recut_ml_client::MlError> for WorkerError {
    fn from(e: recut_ml_client::MlError) -> Self {
        use recut_ml_client::MlError;
        match e {
            MlError::CapabilityDisabled(name) => {
                WorkerError::DependencyUnavailable(name.to_string())
            }
            other => WorkerError::DependencyFailure(other.to_string()),
        }
    }
}

impl From<recut_agent::AgentError> for WorkerError {
    fn from(e: recut_agent::AgentError) -> Self {
        use recut_agent::AgentError;
        match e {
            AgentError::PlanRejected(message) => WorkerError::ValidationFailure(message),
            AgentError::MalformedResponse(message) => WorkerError::DependencyFailure(message),
            AgentError::Llm(inner) => WorkerError::from(inner),
        }
    }
}

impl From<recut_storage::StorageError> for WorkerError {
    fn from(e: recut_storage::StorageError) -> Self {
        use recut_storage::StorageError;
        match e {
            StorageError::NotConfigured => {
                WorkerError::DependencyUnavailable("object storage".to_string())
            }
            other => WorkerError::DependencyFailure(other.to_string()),
        }
    }
}

impl From<recut_queue::QueueError> for WorkerError {
    fn from(e: recut_queue::QueueError) -> Self {
        use recut_queue::QueueError;
        match e {
            QueueError::JobNotFound(id) => WorkerError::NotFound(format!("job {id}")),
            other => WorkerError::Transient(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_by_kind() {
        assert!(WorkerError::Transient("net".into()).is_retryable());
        assert!(WorkerError::DependencyFailure("llm 500".into()).is_retryable());
        assert!(WorkerError::RenderFailure("ffmpeg".into()).is_retryable());

        assert!(!WorkerError::InvalidInput("bad".into()).is_retryable());
        assert!(!WorkerError::ValidationFailure("empty edl".into()).is_retryable());
        assert!(!WorkerError::Cancelled.is_retryable());
    }

    #[test]
    fn test_media_error_mapping() {
        let e: WorkerError = recut_media::MediaError::EmptyEdl.into();
        assert!(matches!(e, WorkerError::ValidationFailure(_)));

        let e: WorkerError = recut_media::MediaError::FfmpegNotFound.into();
        assert!(matches!(e, WorkerError::DependencyUnavailable(_)));

        let e: WorkerError = recut_media::MediaError::download_failed("502").into();
        assert!(matches!(e, WorkerError::Transient(_)));
    }

    #[test]
    fn test_agent_rejection_is_validation_failure() {
        let e: WorkerError = recut_agent::AgentError::rejected("all skip").into();
        assert!(matches!(e, WorkerError::ValidationFailure(_)));
        assert!(!e.is_retryable());
    }
}
