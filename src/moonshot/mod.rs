// Moonshot module - chat-completions client for the Kimi API

pub mod builder;
pub mod client;
pub mod error;
pub mod types;

pub use builder::RequestBuilder;
pub use client::{CompletionBackend, MoonshotClient};
pub use error::{ClientError, ClientInitError};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, Delta, FinishReason, FunctionCall,
    FunctionSpec, Role, StreamChoice, StreamChunk, ToolCall, ToolDefinition, Usage,
};

/// Placeholder keys shipped in sample .env files; never valid credentials.
const PLACEHOLDER_KEYS: &[&str] = &["sk-demo_key_please_replace", "your_moonshot_api_key_here"];

/// Client configuration
#[derive(Debug, Clone)]
pub struct MoonshotConfig {
    /// API base URL
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Model used for the initial completion round-trip
    pub model: String,
    /// Tool-execution-capable model used for the follow-up round-trip
    pub tool_model: String,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl MoonshotConfig {
    /// Load from environment variables (and .env when present).
    pub fn from_env() -> Result<Self, ClientInitError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("MOONSHOT_API_KEY")
            .map_err(|_| ClientInitError::ConfigMissing("MOONSHOT_API_KEY".into()))?;
        if api_key.is_empty() || PLACEHOLDER_KEYS.contains(&api_key.as_str()) {
            return Err(ClientInitError::ConfigInvalid(
                "MOONSHOT_API_KEY is a placeholder; set a real key".into(),
            ));
        }

        let base_url = std::env::var("MOONSHOT_BASE_URL")
            .unwrap_or_else(|_| "https://api.moonshot.ai/v1".to_string());

        let model =
            std::env::var("KIMI_MODEL").unwrap_or_else(|_| "moonshot-v1-128k".to_string());

        // The follow-up after a tool execution always targets this variant.
        let tool_model = std::env::var("KIMI_TOOL_MODEL")
            .unwrap_or_else(|_| "kimi-k2-0711-preview".to_string());

        let temperature: f32 = std::env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.6);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ClientInitError::ConfigInvalid(format!(
                "TEMPERATURE must be within 0.0-2.0, got {}",
                temperature
            )));
        }

        let max_tokens = std::env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096);

        let request_timeout_secs = std::env::var("MOONSHOT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        Ok(Self {
            base_url,
            api_key,
            model,
            tool_model,
            temperature,
            max_tokens,
            request_timeout_secs,
        })
    }
}
