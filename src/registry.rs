//! Tool registry: the catalog of invocable tools and the single
//! execution entry point.
//!
//! Every handler failure is captured and turned into a failed
//! [`ToolCallRecord`] so the orchestration loop always gets a uniform
//! result shape; `execute` never raises past its own boundary.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::SchemaNode;
use crate::types::{ToolCallRecord, ToolDefinition};

/// Trait every tool implements.
///
/// Handlers are pure async functions of their arguments; they must not
/// share mutable state with the registry or each other. The declared
/// schema must describe every field the handler reads.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within the registry (e.g. "convert_unit").
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Schema of the accepted arguments object.
    fn schema(&self) -> SchemaNode;

    /// Run the tool. An `Err` becomes a failed call record upstream.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// The catalog entry offered to the completion service.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}

/// Holds the registered tools and dispatches calls by name.
///
/// Registration happens once at startup; the registry is read-only at
/// call time, so it needs no synchronization.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Names must be unique; a duplicate is dropped.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        if self.has_tool(tool.name()) {
            warn!(tool = tool.name(), "duplicate tool name, ignoring");
            return;
        }
        self.tools.push(tool);
    }

    /// Catalog of every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name, producing a terminal call record.
    ///
    /// Unknown names, schema violations, and handler errors all come
    /// back as failed records; this method never returns an error.
    pub async fn execute(&self, name: &str, arguments: Value, call_id: &str) -> ToolCallRecord {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!(tool = name, "tool not found");
            return ToolCallRecord::failed(
                call_id,
                name,
                arguments,
                format!("tool not found: {name}"),
            );
        };

        let mut call = ToolCallRecord::pending(call_id, name, arguments.clone());
        call.begin_execution();
        let started = Instant::now();

        let mut args = arguments;
        if let Err(msg) = tool.schema().validate_arguments(&mut args) {
            call.fail(
                format!("invalid arguments: {msg}"),
                started.elapsed().as_millis() as u64,
            );
            return call;
        }
        // Record the defaults-filled arguments the handler actually saw.
        call.arguments = args.clone();

        match tool.execute(args).await {
            Ok(result) => {
                let elapsed = started.elapsed().as_millis() as u64;
                debug!(tool = name, elapsed_ms = elapsed, "tool completed");
                call.complete(result, elapsed);
            }
            Err(e) => {
                let elapsed = started.elapsed().as_millis() as u64;
                warn!(tool = name, error = %e, "tool failed");
                call.fail(e.to_string(), elapsed);
            }
        }
        call
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallStatus;
    use anyhow::bail;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the given text back"
        }
        fn schema(&self) -> SchemaNode {
            SchemaNode::object(
                [
                    ("text", SchemaNode::string("Text to echo")),
                    (
                        "loud",
                        SchemaNode::boolean("Uppercase the echo").with_default(json!(false)),
                    ),
                ],
                &["text"],
            )
        }
        async fn execute(&self, args: Value) -> Result<Value> {
            let text = args["text"].as_str().unwrap_or_default();
            let loud = args["loud"].as_bool().unwrap_or(false);
            Ok(json!({ "echo": if loud { text.to_uppercase() } else { text.to_string() } }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn description(&self) -> &str {
            "Fails unconditionally"
        }
        fn schema(&self) -> SchemaNode {
            SchemaNode::object([], &[])
        }
        async fn execute(&self, _args: Value) -> Result<Value> {
            bail!("handler exploded")
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Box::new(EchoTool));
        reg.register(Box::new(FailingTool));
        reg
    }

    #[tokio::test]
    async fn unknown_tool_yields_failed_record_not_error() {
        let call = registry().execute("no_such_tool", json!({}), "c1").await;
        assert_eq!(call.status, CallStatus::Failed);
        assert!(call.error.unwrap().contains("tool not found"));
    }

    #[tokio::test]
    async fn successful_call_records_result_and_duration() {
        let call = registry().execute("echo", json!({"text": "hi"}), "c2").await;
        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.result.unwrap()["echo"], "hi");
        assert!(call.execution_time_ms.is_some());
        assert!(call.error.is_none());
    }

    #[tokio::test]
    async fn defaults_are_filled_before_dispatch() {
        let call = registry().execute("echo", json!({"text": "hi"}), "c3").await;
        // The recorded arguments include the schema default.
        assert_eq!(call.arguments["loud"], false);
    }

    #[tokio::test]
    async fn handler_error_becomes_failed_record() {
        let call = registry().execute("always_fails", json!({}), "c4").await;
        assert_eq!(call.status, CallStatus::Failed);
        assert_eq!(call.error.as_deref(), Some("handler exploded"));
        assert!(call.execution_time_ms.is_some());
    }

    #[tokio::test]
    async fn schema_violation_becomes_failed_record() {
        let call = registry().execute("echo", json!({"text": 7}), "c5").await;
        assert_eq!(call.status, CallStatus::Failed);
        assert!(call.error.unwrap().starts_with("invalid arguments:"));
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut reg = registry();
        reg.register(Box::new(EchoTool));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn catalog_preserves_registration_order() {
        let defs = registry().definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "always_fails");
    }
}
