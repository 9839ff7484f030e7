//! Stdio tool-protocol bridge.
//!
//! Exposes the tool registry over JSON-RPC 2.0, one request per line on
//! stdin and one response per line on stdout, so external hosts can list
//! and invoke tools without the chat loop. Logging goes to stderr;
//! stdout carries only protocol frames.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::registry::ToolRegistry;

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

pub struct Bridge {
    registry: Arc<ToolRegistry>,
}

impl Bridge {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Read requests from stdin until EOF, writing one response line per
    /// request. Notifications (no id) produce no response.
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(line).await {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                stdout.write_all(frame.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable frame");
                return Some(error_response(Value::Null, PARSE_ERROR, "Parse error"));
            }
        };

        let id = request.get("id").cloned();
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        debug!(method = %method, "bridge request");
        let result = self.dispatch(&method, params).await;

        // A request without an id is a notification: run it, reply to no one.
        let id = id?;
        Some(match result {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, message)) => error_response(id, code, &message),
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": "whisperfunc",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": { "tools": {} },
            })),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .registry
                    .definitions()
                    .into_iter()
                    .map(|def| {
                        json!({
                            "name": def.name,
                            "description": def.description,
                            "inputSchema": def.parameters,
                        })
                    })
                    .collect();
                Ok(json!({ "tools": tools }))
            }
            "tools/call" => self.call_tool(params).await,
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }

    async fn call_tool(&self, params: Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "missing tool name".to_string()))?
            .to_string();
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let call_id = uuid::Uuid::new_v4().to_string();
        let record = self.registry.execute(&name, arguments, &call_id).await;

        Ok(match (record.result, record.error) {
            (Some(result), _) => {
                let text = serde_json::to_string(&result)
                    .unwrap_or_else(|_| "null".to_string());
                json!({ "content": [{ "type": "text", "text": text }] })
            }
            (None, error) => {
                let text = error.unwrap_or_else(|| "tool execution failed".to_string());
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": true,
                })
            }
        })
    }
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::create_default_registry;
    use std::path::PathBuf;

    fn bridge() -> Bridge {
        let registry = create_default_registry(
            PathBuf::from("/tmp"),
            "https://catalog.example.com".to_string(),
        );
        Bridge::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = bridge()
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "whisperfunc");
    }

    #[tokio::test]
    async fn tools_list_exposes_the_catalog() {
        let response = bridge()
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().any(|t| t["name"] == "calculate"));
        assert!(tools[0]["inputSchema"]["type"].is_string());
    }

    #[tokio::test]
    async fn tools_call_runs_a_tool() {
        let response = bridge()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"calculate","arguments":{"expression":"6*7"}}}"#,
            )
            .await
            .unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("42"));
        assert!(response["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn failed_call_is_flagged_not_raised() {
        let response = bridge()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"no_such_tool","arguments":{}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("tool not found"));
    }

    #[tokio::test]
    async fn unknown_method_and_parse_errors() {
        let response = bridge()
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);

        let response = bridge().handle_line("not json at all").await.unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn notification_gets_no_response() {
        let response = bridge()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }
}
