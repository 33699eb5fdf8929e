// Integration tests for the Moonshot wire types and request builder
// Run with: cargo test --test test_moonshot

use kimi_agent::moonshot::{
    ChatResponse, FinishReason, RequestBuilder, Role, ToolDefinition,
};
use serde_json::json;

#[test]
fn test_builder_rejects_empty_messages() {
    let result = RequestBuilder::new("moonshot-v1-128k").build();
    assert!(result.is_err());
}

/// Optional fields are omitted from the wire form entirely when unset
#[test]
fn test_request_serialization_omits_unset_fields() {
    let request = RequestBuilder::new("moonshot-v1-128k")
        .user("hi")
        .build()
        .unwrap();

    let value = serde_json::to_value(&request).unwrap();
    let object = value.as_object().unwrap();

    assert!(object.contains_key("model"));
    assert!(object.contains_key("messages"));
    assert!(!object.contains_key("tools"));
    assert!(!object.contains_key("tool_choice"));
    assert!(!object.contains_key("temperature"));
    assert!(!object.contains_key("stream"));
}

#[test]
fn test_request_serialization_with_tool() {
    let tool = ToolDefinition::function(
        "code_runner",
        "Run code",
        json!({"type": "object", "properties": {}}),
    );
    let request = RequestBuilder::new("moonshot-v1-128k")
        .system("be brief")
        .user("hi")
        .tool(tool)
        .tool_choice("auto")
        .temperature(0.6)
        .max_tokens(4096)
        .build()
        .unwrap();

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["messages"][0]["role"], "system");
    assert_eq!(value["messages"][1]["role"], "user");
    assert_eq!(value["tools"][0]["type"], "function");
    assert_eq!(value["tools"][0]["function"]["name"], "code_runner");
    assert_eq!(value["tool_choice"], "auto");
    assert_eq!(value["max_tokens"], 4096);
}

/// Plain messages never carry tool fields on the wire
#[test]
fn test_plain_message_has_no_tool_fields() {
    let request = RequestBuilder::new("m").user("hi").build().unwrap();
    let value = serde_json::to_value(&request.messages[0]).unwrap();
    let object = value.as_object().unwrap();

    assert!(!object.contains_key("tool_calls"));
    assert!(!object.contains_key("tool_call_id"));
}

#[test]
fn test_response_deserialization_with_tool_call() {
    let body = r#"{
        "id": "chatcmpl-1",
        "model": "moonshot-v1-128k",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call-1",
                    "type": "function",
                    "function": {
                        "name": "code_runner",
                        "arguments": "{\"language\": \"python\", \"code\": \"print(1)\"}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }"#;

    let response: ChatResponse = serde_json::from_str(body).unwrap();
    let choice = &response.choices[0];

    assert_eq!(choice.message.role, Role::Assistant);
    assert!(choice.message.content.is_none());
    assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));

    let calls = choice.message.tool_calls.as_ref().unwrap();
    assert_eq!(calls[0].id, "call-1");
    assert_eq!(calls[0].function.name, "code_runner");
    assert!(calls[0].function.arguments.contains("print(1)"));

    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

/// Finish reasons we do not know about must not break deserialization
#[test]
fn test_unknown_finish_reason_maps_to_other() {
    let body = r#"{
        "choices": [{
            "message": {"role": "assistant", "content": "hi"},
            "finish_reason": "weird_new_reason"
        }]
    }"#;

    let response: ChatResponse = serde_json::from_str(body).unwrap();
    assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Other));
}
