// Agent errors

use thiserror::Error;

/// Agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model round-trip failed: {0}")]
    ModelFailure(String),

    #[error("Malformed tool call: {0}")]
    MalformedToolCall(String),

    #[error("Plan worker failed: {0}")]
    WorkerFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
