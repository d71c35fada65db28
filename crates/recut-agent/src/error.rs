//! Agent error types.

use thiserror::Error;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] recut_ml_client::MlError),

    #[error("plan rejected: {0}")]
    PlanRejected(String),

    #[error("malformed agent response: {0}")]
    MalformedResponse(String),
}

impl AgentError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::PlanRejected(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}
