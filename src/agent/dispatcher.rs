// Tool-call dispatcher - model round-trip, local execution, follow-up round-trip

use crate::executor::{CodeRunnerTool, ExecutionResult, ExecutorConfig, ToolImpl};
use crate::moonshot::{
    ChatResponse, CompletionBackend, FinishReason, MoonshotConfig, RequestBuilder, ToolCall,
};
use crate::session::Session;

use super::config::AgentConfig;

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dispatcher progression for one user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingModel,
    ToolRequested,
    Resolved,
}

/// What the caller gets back, in every case - including full failure.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub content: String,
    pub is_error: bool,
    /// Present when a tool call was actually executed this round.
    pub execution: Option<ExecutionResult>,
}

impl DispatchOutcome {
    fn answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            execution: None,
        }
    }

    fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            execution: None,
        }
    }
}

/// Drives the tool-call protocol: send the conversation with the
/// `code_runner` schema, service at most the first tool call, fold the
/// execution result back into the session, and resolve with a follow-up
/// round-trip on the dedicated tool-capable model.
///
/// Snippets go to the executor without the shell deny-list; the deny
/// patterns are shell-oriented and do not apply to interpreter source.
pub struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    model_config: MoonshotConfig,
    tool: CodeRunnerTool,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        model_config: MoonshotConfig,
        agent_config: &AgentConfig,
        exec_config: ExecutorConfig,
    ) -> Self {
        let tool = CodeRunnerTool::new(exec_config, agent_config.code_timeout_secs);
        Self {
            backend,
            model_config,
            tool,
        }
    }

    /// Service one user prompt end to end. Never returns an error: every
    /// failure mode resolves into an outcome the caller can render.
    pub async fn dispatch(&self, session: &mut Session, prompt: &str) -> DispatchOutcome {
        session.push_user(prompt);

        let mut state = DispatchState::AwaitingModel;
        debug!(state = ?state, turns = session.len(), "starting dispatch");

        let request = match RequestBuilder::new(&self.model_config.model)
            .messages(session.messages())
            .tool(self.tool.definition())
            .tool_choice("auto")
            .temperature(self.model_config.temperature)
            .max_tokens(self.model_config.max_tokens)
            .build()
        {
            Ok(request) => request,
            Err(e) => return DispatchOutcome::error(e),
        };

        let response = match self.backend.chat_completion(request).await {
            Ok(response) => response,
            Err(e) => return DispatchOutcome::error(format!("Model request failed: {}", e)),
        };

        let Some(call) = first_tool_call(&response).cloned() else {
            // No tool call: resolve with the plain content, the executor is
            // never invoked.
            let content = plain_content(&response).unwrap_or_default();
            session.push_assistant(content.clone());
            return DispatchOutcome::answer(content);
        };

        state = DispatchState::ToolRequested;
        info!(state = ?state, id = %call.id, function = %call.function.name, "tool call requested");

        if call.function.name != CodeRunnerTool::NAME {
            warn!(function = %call.function.name, "unknown tool requested");
            return self.fall_back(
                session,
                &response,
                format!("Unknown tool: {}", call.function.name),
            );
        }

        let result = match self.tool.run(&call.function.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "tool call aborted");
                return self.fall_back(session, &response, e.to_string());
            }
        };

        // The tool turn carries exactly {stdout, stderr, exit_code} - the
        // wire contract with the model.
        let wire = match serde_json::to_string(&result) {
            Ok(wire) => wire,
            Err(e) => return DispatchOutcome::error(format!("Result serialization failed: {}", e)),
        };
        session.push_assistant_tool_calls(plain_content(&response), vec![call.clone()]);
        session.push_tool(&call.id, wire);

        // The follow-up always targets the dedicated tool-execution-capable
        // model variant, not the model that requested the call.
        let follow_up = match RequestBuilder::new(&self.model_config.tool_model)
            .messages(session.messages())
            .temperature(self.model_config.temperature)
            .max_tokens(self.model_config.max_tokens)
            .build()
        {
            Ok(request) => request,
            Err(e) => return DispatchOutcome::error(e),
        };

        match self.backend.chat_completion(follow_up).await {
            Ok(second) => {
                state = DispatchState::Resolved;
                let content = plain_content(&second).unwrap_or_default();
                session.push_assistant(content.clone());
                debug!(state = ?state, "dispatch resolved");

                DispatchOutcome {
                    content,
                    is_error: false,
                    execution: Some(result),
                }
            }
            Err(e) => DispatchOutcome {
                content: format!("Follow-up request failed: {}", e),
                is_error: true,
                execution: Some(result),
            },
        }
    }

    /// Protocol failure: abort the tool attempt and fall back to the
    /// response's plain text, if it carried any.
    fn fall_back(
        &self,
        session: &mut Session,
        response: &ChatResponse,
        reason: String,
    ) -> DispatchOutcome {
        match plain_content(response) {
            Some(text) if !text.is_empty() => {
                session.push_assistant(text.clone());
                DispatchOutcome::answer(text)
            }
            _ => DispatchOutcome::error(reason),
        }
    }
}

/// First tool call of a response whose finish reason is `tool_calls`.
///
/// Only one tool call is serviced per round-trip; additional calls in the
/// same response are counted and ignored.
pub fn first_tool_call(response: &ChatResponse) -> Option<&ToolCall> {
    let choice = response.choices.first()?;
    if choice.finish_reason != Some(FinishReason::ToolCalls) {
        return None;
    }

    let calls = choice.message.tool_calls.as_deref().unwrap_or(&[]);
    let first = calls.first()?;
    if calls.len() > 1 {
        warn!(
            ignored = calls.len() - 1,
            "servicing only the first tool call in the response"
        );
    }
    Some(first)
}

/// Plain message content of the first choice.
pub fn plain_content(response: &ChatResponse) -> Option<String> {
    response.choices.first().and_then(|c| c.message.content.clone())
}
