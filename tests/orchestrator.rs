//! End-to-end orchestration turns against a scripted completion backend.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use whisperfunc::error::{CompletionError, TurnError};
use whisperfunc::llm::CompletionBackend;
use whisperfunc::orchestrator::Orchestrator;
use whisperfunc::tools::create_default_registry;
use whisperfunc::types::{
    CallStatus, ChatResponse, ProtocolMessage, Role, ToolCallRequest, ToolDefinition,
};

/// Replays a fixed script of completion responses and records every
/// message list it was sent.
struct ScriptedBackend {
    script: Mutex<Vec<Result<ChatResponse, CompletionError>>>,
    seen: Mutex<Vec<Vec<ProtocolMessage>>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<ChatResponse, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<Vec<ProtocolMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn chat(
        &self,
        messages: &[ProtocolMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, CompletionError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(CompletionError::MalformedResponse(
                "script exhausted".to_string(),
            ));
        }
        script.remove(0)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
    }
}

fn tool_response(calls: Vec<ToolCallRequest>) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        tool_calls: calls,
        finish_reason: "tool_calls".to_string(),
    }
}

fn request(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

fn harness(
    script: Vec<Result<ChatResponse, CompletionError>>,
) -> (Orchestrator, Arc<ScriptedBackend>, TempDir) {
    let backend = Arc::new(ScriptedBackend::new(script));
    let sandbox = tempfile::tempdir().unwrap();
    let registry = create_default_registry(
        sandbox.path().to_path_buf(),
        "https://catalog.example.com".to_string(),
    );
    let orchestrator = Orchestrator::new(backend.clone(), Arc::new(registry));
    (orchestrator, backend, sandbox)
}

#[tokio::test]
async fn turn_without_tool_calls_returns_content_verbatim() {
    let (orchestrator, backend, _sandbox) =
        harness(vec![Ok(text_response("Hello! How can I help?"))]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("hi")])
        .await
        .unwrap();

    assert_eq!(outcome.content, "Hello! How can I help?");
    assert!(outcome.function_calls.is_empty());
    assert_eq!(outcome.finish_reason, "stop");
    // No tool calls means no second round.
    assert_eq!(backend.seen().len(), 1);
}

#[tokio::test]
async fn batch_preserves_order_and_mixes_outcomes() {
    let (orchestrator, _backend, _sandbox) = harness(vec![
        Ok(tool_response(vec![
            request("c1", "calculate", r#"{"expression": "6*7"}"#),
            request("c2", "no_such_tool", "{}"),
            request(
                "c3",
                "convert_unit",
                r#"{"value": 1, "fromUnit": "kilometer", "toUnit": "meter"}"#,
            ),
        ])),
        Ok(text_response("All done.")),
    ]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("do three things")])
        .await
        .unwrap();

    assert_eq!(outcome.content, "All done.");
    assert_eq!(outcome.function_calls.len(), 3);

    let ids: Vec<&str> = outcome
        .function_calls
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, ["c1", "c2", "c3"]);

    assert_eq!(outcome.function_calls[0].status, CallStatus::Completed);
    assert_eq!(outcome.function_calls[0].result.as_ref().unwrap()["result"], 42.0);

    assert_eq!(outcome.function_calls[1].status, CallStatus::Failed);
    assert!(outcome.function_calls[1]
        .error
        .as_deref()
        .unwrap()
        .contains("tool not found"));

    assert_eq!(outcome.function_calls[2].status, CallStatus::Completed);
}

#[tokio::test]
async fn tool_results_are_visible_to_the_second_round() {
    let (orchestrator, backend, _sandbox) = harness(vec![
        Ok(tool_response(vec![request(
            "c1",
            "calculate",
            r#"{"expression": "2+2"}"#,
        )])),
        Ok(text_response("The answer is 4.")),
    ]);

    orchestrator
        .run_turn(vec![ProtocolMessage::user("what is 2+2?")])
        .await
        .unwrap();

    let rounds = backend.seen();
    assert_eq!(rounds.len(), 2);

    // Round 2 sees the original user message, the assistant's request
    // turn, and the tool-result turn keyed by the request id.
    let second = &rounds[1];
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].role, Role::User);
    assert_eq!(second[1].role, Role::Assistant);
    assert_eq!(second[1].tool_calls.len(), 1);
    assert_eq!(second[1].content, "");
    assert_eq!(second[2].role, Role::Tool);
    assert_eq!(second[2].tool_call_id.as_deref(), Some("c1"));
    assert!(second[2].content.contains("\"result\":4"));
}

#[tokio::test]
async fn malformed_argument_blob_becomes_failed_record() {
    let (orchestrator, _backend, _sandbox) = harness(vec![
        Ok(tool_response(vec![
            request("c1", "calculate", "{broken json"),
            request("c2", "calculate", ""),
        ])),
        Ok(text_response("done")),
    ]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("go")])
        .await
        .unwrap();

    assert_eq!(outcome.function_calls.len(), 2);
    assert_eq!(outcome.function_calls[0].status, CallStatus::Failed);
    assert!(outcome.function_calls[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("invalid JSON arguments:"));

    // An empty blob means no arguments; calculate then fails its own
    // schema check, not JSON parsing.
    assert_eq!(outcome.function_calls[1].status, CallStatus::Failed);
    assert!(outcome.function_calls[1]
        .error
        .as_deref()
        .unwrap()
        .starts_with("invalid arguments:"));
}

#[tokio::test]
async fn second_round_failure_degrades_but_keeps_the_batch() {
    let (orchestrator, _backend, _sandbox) = harness(vec![
        Ok(tool_response(vec![request(
            "c1",
            "calculate",
            r#"{"expression": "10/4"}"#,
        )])),
        Err(CompletionError::Timeout("deadline elapsed".to_string())),
    ]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("divide")])
        .await
        .unwrap();

    assert_eq!(outcome.finish_reason, "error");
    assert!(outcome.content.contains("Executed 1 function call(s)"));
    assert!(outcome.content.contains("timed out"));
    assert_eq!(outcome.function_calls.len(), 1);
    assert_eq!(outcome.function_calls[0].status, CallStatus::Completed);
    assert_eq!(
        outcome.function_calls[0].result.as_ref().unwrap()["result"],
        2.5
    );
}

#[tokio::test]
async fn empty_history_is_rejected_before_round_one() {
    let (orchestrator, backend, _sandbox) = harness(vec![Ok(text_response("unused"))]);

    let err = orchestrator.run_turn(vec![]).await.unwrap_err();
    assert!(matches!(err, TurnError::InvalidInput(_)));
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn first_round_failure_aborts_the_turn() {
    let (orchestrator, _backend, _sandbox) = harness(vec![Err(CompletionError::Service {
        status: 503,
        body: "overloaded".to_string(),
    })]);

    let err = orchestrator
        .run_turn(vec![ProtocolMessage::user("hi")])
        .await
        .unwrap_err();

    match err {
        TurnError::Completion(CompletionError::Service { status, .. }) => {
            assert_eq!(status, 503);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn file_tools_run_inside_the_sandbox() {
    let (orchestrator, _backend, sandbox) = harness(vec![
        Ok(tool_response(vec![
            request(
                "c1",
                "write_file",
                r#"{"filePath": "notes/a.txt", "content": "from a turn"}"#,
            ),
            request("c2", "read_file", r#"{"filePath": "notes/a.txt"}"#),
        ])),
        Ok(text_response("written and read")),
    ]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("save a note")])
        .await
        .unwrap();

    assert_eq!(outcome.function_calls[0].status, CallStatus::Completed);
    assert_eq!(
        outcome.function_calls[1].result.as_ref().unwrap()["content"],
        "from a turn"
    );
    assert!(sandbox.path().join("notes/a.txt").exists());
}

#[tokio::test]
async fn defaults_from_the_schema_reach_the_record() {
    let (orchestrator, _backend, _sandbox) = harness(vec![
        Ok(tool_response(vec![request(
            "c1",
            "get_current_time",
            r#"{"timezone": "UTC"}"#,
        )])),
        Ok(text_response("here is the time")),
    ]);

    let outcome = orchestrator
        .run_turn(vec![ProtocolMessage::user("what time is it?")])
        .await
        .unwrap();

    let call = &outcome.function_calls[0];
    assert_eq!(call.status, CallStatus::Completed);
    // The format argument was omitted; the schema default was filled in.
    assert_eq!(call.arguments["format"], json!("ISO"));
}
