// Error types for Executor module

use thiserror::Error;

/// Executor error types
///
/// Subprocess failures never surface here; they are folded into
/// `ExecutionResult`. These errors cover contract violations caught before
/// anything is spawned, plus config-file IO.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid input for tool '{0}': {1}")]
    InvalidInput(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
