// Moonshot client - HTTP communication with the chat-completions API

use super::{ChatRequest, ChatResponse, ClientError, MoonshotConfig, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Seam between the dispatcher and the hosted model API.
///
/// A round-trip either returns a parsed response or a single error; there is
/// no automatic retry at this layer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, ClientError>;
}

/// Client for the Moonshot AI (Kimi) API
#[derive(Clone)]
pub struct MoonshotClient {
    config: MoonshotConfig,
    http: Client,
}

impl MoonshotClient {
    pub fn new(config: MoonshotConfig) -> Result<Self, super::ClientInitError> {
        info!(
            base_url = %config.base_url,
            model = %config.model,
            tool_model = %config.tool_model,
            timeout_secs = config.request_timeout_secs,
            "initializing moonshot client"
        );

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(super::ClientInitError::ClientError)?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &MoonshotConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = self.completions_url();
        debug!(url = %url, "sending HTTP request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "received HTTP response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }

    /// Streaming chat: deltas are handed to `on_delta` as they arrive and
    /// the accumulated text is returned once the stream ends.
    pub async fn chat_completion_stream(
        &self,
        mut request: ChatRequest,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, ClientError> {
        request.stream = Some(true);

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut full_text = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // SSE events are newline-delimited; a chunk may split one.
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let line = line.trim();

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(full_text);
                }

                let event: StreamChunk = serde_json::from_str(data)?;
                if let Some(choice) = event.choices.first()
                    && let Some(content) = &choice.delta.content
                {
                    full_text.push_str(content);
                    on_delta(content);
                }
            }
        }

        Ok(full_text)
    }
}

#[async_trait]
impl CompletionBackend for MoonshotClient {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        info!(
            model = %request.model,
            messages_count = request.messages.len(),
            has_tools = request.tools.is_some(),
            "starting chat completion"
        );

        let start = Instant::now();
        match self.send_request(&request).await {
            Ok(response) => {
                let (prompt_tokens, completion_tokens) = response
                    .usage
                    .as_ref()
                    .map(|u| (u.prompt_tokens, u.completion_tokens))
                    .unwrap_or((0, 0));

                info!(
                    model = %response.model,
                    prompt_tokens = prompt_tokens,
                    completion_tokens = completion_tokens,
                    latency_ms = start.elapsed().as_millis() as u64,
                    finish_reason = ?response.choices.first().and_then(|c| c.finish_reason),
                    "chat completion succeeded"
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "chat completion failed"
                );
                Err(e)
            }
        }
    }
}

fn map_status(status: StatusCode, body: String) -> ClientError {
    match status.as_u16() {
        401 => ClientError::AuthenticationFailed(body),
        400 => ClientError::InvalidRequest(body),
        402 => ClientError::InsufficientBalance(body),
        429 => ClientError::RateLimited(body),
        _ if status.is_server_error() => ClientError::ModelError(body),
        s => ClientError::InvalidRequest(format!("HTTP {}: {}", s, body)),
    }
}
