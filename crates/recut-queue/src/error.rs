//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("enqueue failed: {message}")]
    EnqueueFailed { message: String },

    #[error("job not found: {0}")]
    JobNotFound(String),
}

impl QueueError {
    pub fn enqueue_failed(message: impl Into<String>) -> Self {
        Self::EnqueueFailed {
            message: message.into(),
        }
    }
}
