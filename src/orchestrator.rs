//! The function-calling orchestration loop.
//!
//! One turn drives at most two completion rounds:
//!
//! ```text
//! user message
//!     |
//!     v
//! round 1 ----- no tool calls -----> done (assistant text verbatim)
//!     |
//!     | tool calls requested
//!     v
//! execute batch sequentially, in request order
//!     |
//!     v
//! round 2 ----- ok ----------------> done (final text + call records)
//!     |
//!     | failed
//!     v
//! degraded message + call records   (partial credit)
//! ```
//!
//! The depth is fixed: exactly one extra completion round after tool
//! execution, even if the model asks for more tools in round 2. This is
//! a deliberate bound, not multi-hop chaining.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::TurnError;
use crate::llm::CompletionBackend;
use crate::registry::ToolRegistry;
use crate::types::{ConversationMessage, ProtocolMessage, Role, ToolCallRecord, TurnOutcome};

pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    registry: Arc<ToolRegistry>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, registry: Arc<ToolRegistry>) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one orchestration turn over the given working history.
    ///
    /// The history must already end with the new user message. A batch
    /// of N requested tool calls always yields exactly N records in
    /// request order, whatever their individual outcomes. Only a
    /// round-1 completion failure aborts the turn; a round-2 failure
    /// degrades to an explanatory message that still carries the full
    /// batch, so the caller always sees which tools ran.
    pub async fn run_turn(
        &self,
        mut history: Vec<ProtocolMessage>,
    ) -> Result<TurnOutcome, TurnError> {
        if history.is_empty() {
            return Err(TurnError::InvalidInput(
                "conversation history must not be empty".to_string(),
            ));
        }
        let tools = self.registry.definitions();

        let first = self.backend.chat(&history, &tools).await?;

        if !first.has_tool_calls() {
            return Ok(TurnOutcome {
                content: first.content,
                function_calls: vec![],
                finish_reason: first.finish_reason,
            });
        }

        info!(count = first.tool_calls.len(), "model requested tool calls");
        let mut calls: Vec<ToolCallRecord> = Vec::with_capacity(first.tool_calls.len());

        for request in &first.tool_calls {
            let record = match parse_argument_blob(&request.arguments) {
                Ok(args) => self.registry.execute(&request.name, args, &request.id).await,
                Err(e) => ToolCallRecord::failed(
                    &request.id,
                    &request.name,
                    Value::Object(Default::default()),
                    format!("invalid JSON arguments: {e}"),
                ),
            };

            // Transcript: the assistant's request turn verbatim, then the
            // tool-result turn keyed by the same request id.
            history.push(ProtocolMessage::assistant_with_tool_calls(
                "",
                vec![request.clone()],
            ));
            history.push(ProtocolMessage::tool_result(
                &request.id,
                result_payload(&record),
            ));

            calls.push(record);
        }

        match self.backend.chat(&history, &tools).await {
            Ok(wrap_up) => Ok(TurnOutcome {
                content: wrap_up.content,
                function_calls: calls,
                finish_reason: wrap_up.finish_reason,
            }),
            Err(e) => {
                warn!(error = %e, "wrap-up completion failed, returning tool results anyway");
                Ok(TurnOutcome {
                    content: format!(
                        "Executed {} function call(s), but generating the final reply failed: {e}",
                        calls.len()
                    ),
                    function_calls: calls,
                    finish_reason: "error".to_string(),
                })
            }
        }
    }
}

/// Parse a tool-call argument blob. An empty blob means "no arguments",
/// not an error.
fn parse_argument_blob(blob: &str) -> Result<Value, serde_json::Error> {
    if blob.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(blob)
}

/// The tool-turn content fed back to the model: the serialized result on
/// success, the serialized error message on failure.
fn result_payload(record: &ToolCallRecord) -> String {
    let value = match (&record.result, &record.error) {
        (Some(result), _) => result.clone(),
        (None, Some(error)) => Value::String(error.clone()),
        (None, None) => Value::Null,
    };
    serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
}

/// Project the persisted conversation onto the wire: only roles and
/// text content travel; call traces stay local.
pub fn history_from_conversation(messages: &[ConversationMessage]) -> Vec<ProtocolMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::Assistant => ProtocolMessage::assistant(&m.content),
            _ => ProtocolMessage::user(&m.content),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_argument_blob_defaults_to_empty_object() {
        assert_eq!(parse_argument_blob("").unwrap(), json!({}));
        assert_eq!(parse_argument_blob("  ").unwrap(), json!({}));
        assert_eq!(
            parse_argument_blob(r#"{"a":1}"#).unwrap(),
            json!({"a": 1})
        );
        assert!(parse_argument_blob("{not json").is_err());
    }

    #[test]
    fn payload_serializes_result_or_error() {
        let mut ok = ToolCallRecord::pending("c1", "echo", json!({}));
        ok.begin_execution();
        ok.complete(json!({"echo": "hi"}), 1);
        assert_eq!(result_payload(&ok), r#"{"echo":"hi"}"#);

        let failed = ToolCallRecord::failed("c2", "echo", json!({}), "tool not found: echo");
        assert_eq!(result_payload(&failed), r#""tool not found: echo""#);
    }

    #[test]
    fn conversation_projection_drops_call_traces() {
        let call = ToolCallRecord::failed("c1", "x", json!({}), "nope");
        let history = history_from_conversation(&[
            ConversationMessage::user("hi"),
            ConversationMessage::assistant("done", vec![call]),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert!(history[1].tool_calls.is_empty());
    }
}
