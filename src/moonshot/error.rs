// Error types for Moonshot client

use thiserror::Error;

/// Runtime errors from the completion client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Empty response: no choices returned")]
    EmptyResponse,
}

/// Initialization errors for the completion client
#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to create HTTP client: {0}")]
    ClientError(#[from] reqwest::Error),
}
