// Integration tests for the tool-call dispatcher, driven by a scripted
// backend so no network is involved.
// Run with: cargo test --test test_dispatcher

use async_trait::async_trait;
use kimi_agent::agent::{AgentConfig, Dispatcher, first_tool_call};
use kimi_agent::executor::ExecutorConfig;
use kimi_agent::moonshot::{
    ChatMessage, ChatRequest, ChatResponse, Choice, ClientError, CompletionBackend, FinishReason,
    FunctionCall, MoonshotConfig, Role, ToolCall,
};
use kimi_agent::session::Session;
use std::sync::{Arc, Mutex};

/// Backend double: records every request and replays canned responses in
/// order.
struct ScriptedBackend {
    responses: Mutex<Vec<Result<ChatResponse, ClientError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<ChatResponse, ClientError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        assert!(!responses.is_empty(), "backend script exhausted");
        responses.remove(0)
    }
}

fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        id: "resp-text".to_string(),
        model: "moonshot-v1-128k".to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::assistant(content),
            finish_reason: Some(FinishReason::Stop),
        }],
        usage: None,
    }
}

fn tool_response(content: Option<&str>, calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        id: "resp-tool".to_string(),
        model: "moonshot-v1-128k".to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChatMessage {
                role: Role::Assistant,
                content: content.map(str::to_string),
                tool_calls: Some(calls),
                tool_call_id: None,
            },
            finish_reason: Some(FinishReason::ToolCalls),
        }],
        usage: None,
    }
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

fn model_config() -> MoonshotConfig {
    MoonshotConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        api_key: "sk-test".to_string(),
        model: "moonshot-v1-128k".to_string(),
        tool_model: "kimi-k2-0711-preview".to_string(),
        temperature: 0.6,
        max_tokens: 1024,
        request_timeout_secs: 5,
    }
}

fn dispatcher(backend: Arc<ScriptedBackend>) -> Dispatcher {
    Dispatcher::new(
        backend,
        model_config(),
        &AgentConfig::default(),
        ExecutorConfig::default(),
    )
}

/// No tool call: the content passes through untouched, nothing executes
#[tokio::test]
async fn test_plain_answer_passes_through() {
    let backend = ScriptedBackend::new(vec![Ok(text_response("hello there"))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend.clone())
        .dispatch(&mut session, "hi")
        .await;

    assert!(!outcome.is_error);
    assert_eq!(outcome.content, "hello there");
    assert!(outcome.execution.is_none());

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "moonshot-v1-128k");
    assert_eq!(requests[0].tools.as_ref().unwrap().len(), 1);
    assert_eq!(requests[0].tool_choice.as_deref(), Some("auto"));

    let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

/// Full tool round-trip: execute, fold the result in, follow up on the
/// tool-capable model
#[tokio::test]
async fn test_tool_call_round_trip() {
    let arguments = r#"{"language": "python", "code": "print(1+1)"}"#;
    let backend = ScriptedBackend::new(vec![
        Ok(tool_response(None, vec![call("call-1", "code_runner", arguments)])),
        Ok(text_response("The answer is 2")),
    ]);
    let mut session = Session::new();

    let outcome = dispatcher(backend.clone())
        .dispatch(&mut session, "what is 1+1?")
        .await;

    assert!(!outcome.is_error);
    assert_eq!(outcome.content, "The answer is 2");
    let execution = outcome.execution.expect("tool should have executed");
    assert_eq!(execution.exit_code, 0);
    assert_eq!(execution.stdout, "2\n");

    // Follow-up goes to the tool-capable model, without the tool schema
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].model, "kimi-k2-0711-preview");
    assert!(requests[1].tools.is_none());
    assert!(requests[1].tool_choice.is_none());

    // Session: user, assistant carrying the call, tool result, final answer
    let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );

    let assistant_turn = &session.turns()[1];
    assert_eq!(assistant_turn.tool_calls.as_ref().unwrap().len(), 1);

    let tool_turn = &session.turns()[2];
    assert_eq!(tool_turn.tool_call_id.as_deref(), Some("call-1"));

    // The tool turn carries exactly {stdout, stderr, exit_code}
    let wire: serde_json::Value =
        serde_json::from_str(tool_turn.content.as_ref().unwrap()).unwrap();
    let keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    assert_eq!(wire["stdout"], "2\n");
    assert_eq!(wire["stderr"], "");
    assert_eq!(wire["exit_code"], 0);
}

/// Additional tool calls in the same response are ignored
#[tokio::test]
async fn test_only_first_tool_call_is_serviced() {
    let first = call(
        "call-1",
        "code_runner",
        r#"{"language": "python", "code": "print('first')"}"#,
    );
    let second = call(
        "call-2",
        "code_runner",
        r#"{"language": "python", "code": "print('second')"}"#,
    );
    let backend = ScriptedBackend::new(vec![
        Ok(tool_response(None, vec![first, second])),
        Ok(text_response("done")),
    ]);
    let mut session = Session::new();

    let outcome = dispatcher(backend).dispatch(&mut session, "run both").await;

    assert_eq!(outcome.execution.unwrap().stdout, "first\n");

    let assistant_turn = &session.turns()[1];
    assert_eq!(assistant_turn.tool_calls.as_ref().unwrap().len(), 1);
    assert_eq!(
        session
            .turns()
            .iter()
            .filter(|t| t.role == Role::Tool)
            .count(),
        1
    );
}

/// Malformed arguments abort the attempt; plain text in the same response
/// is the fallback answer
#[tokio::test]
async fn test_malformed_arguments_fall_back_to_text() {
    let backend = ScriptedBackend::new(vec![Ok(tool_response(
        Some("plain words"),
        vec![call("call-1", "code_runner", "not json")],
    ))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend.clone()).dispatch(&mut session, "go").await;

    assert!(!outcome.is_error);
    assert_eq!(outcome.content, "plain words");
    assert!(outcome.execution.is_none());
    assert_eq!(backend.requests().len(), 1, "no follow-up without execution");
}

/// Malformed arguments with no fallback text resolve as an error outcome
#[tokio::test]
async fn test_malformed_arguments_without_text_is_error() {
    let backend = ScriptedBackend::new(vec![Ok(tool_response(
        None,
        vec![call("call-1", "code_runner", "not json")],
    ))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend).dispatch(&mut session, "go").await;

    assert!(outcome.is_error);
    assert!(outcome.execution.is_none());
}

/// An unsupported language never reaches the executor
#[tokio::test]
async fn test_unsupported_language_is_rejected() {
    let backend = ScriptedBackend::new(vec![Ok(tool_response(
        None,
        vec![call(
            "call-1",
            "code_runner",
            r#"{"language": "ruby", "code": "puts 1"}"#,
        )],
    ))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend.clone()).dispatch(&mut session, "go").await;

    assert!(outcome.is_error);
    assert!(outcome.execution.is_none());
    assert_eq!(backend.requests().len(), 1);
}

/// A call for a tool we never declared falls back like any protocol failure
#[tokio::test]
async fn test_unknown_tool_falls_back() {
    let backend = ScriptedBackend::new(vec![Ok(tool_response(
        Some("fallback text"),
        vec![call("call-1", "file_writer", "{}")],
    ))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend).dispatch(&mut session, "go").await;

    assert!(!outcome.is_error);
    assert_eq!(outcome.content, "fallback text");
    assert!(outcome.execution.is_none());
}

/// Transport failures resolve into an error outcome, never a panic
#[tokio::test]
async fn test_backend_failure_is_error_outcome() {
    let backend =
        ScriptedBackend::new(vec![Err(ClientError::ModelError("boom".to_string()))]);
    let mut session = Session::new();

    let outcome = dispatcher(backend).dispatch(&mut session, "go").await;

    assert!(outcome.is_error);
    assert!(outcome.content.contains("boom"));
    assert!(outcome.execution.is_none());
}

/// Tool calls only count when the finish reason says so
#[test]
fn test_first_tool_call_requires_tool_calls_finish_reason() {
    let mut response = tool_response(
        None,
        vec![call("call-1", "code_runner", "{}")],
    );
    response.choices[0].finish_reason = Some(FinishReason::Stop);

    assert!(first_tool_call(&response).is_none());
}
