//! Error types for capability clients.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("capability not configured: {0}")]
    CapabilityDisabled(&'static str),

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("scene extraction timed out after {0} seconds")]
    PollTimeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MlError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Whether this error is worth retrying (rate limit or server side).
    pub fn is_retryable(&self) -> bool {
        match self {
            MlError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            MlError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
