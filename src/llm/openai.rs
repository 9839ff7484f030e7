//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionBackend;
use crate::error::CompletionError;
use crate::types::{ChatResponse, ProtocolMessage, Role, ToolCallRequest, ToolDefinition};

/// Fixed instruction prepended to every request. The model translates
/// tool-relevant keywords to English before placing them in arguments,
/// keeps its final reply in the user's language, and decides on its own
/// whether a function call is warranted.
const SYSTEM_PROMPT: &str = "\
You are an assistant that can call local functions on the user's behalf.

Rules:
1. Function arguments must be in English. When the user writes in another \
language, translate the tool-relevant keywords (search terms, file names, \
expressions) to English before putting them into function arguments.
2. Your final reply to the user must be in the user's own language.
3. Analyse each request and decide yourself whether a function call is \
needed; answer directly when none is.
4. After a function has run, explain its result to the user in their \
language.";

pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

// --- API Request Types (OpenAI format) ---

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ApiMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ApiTool {
    r#type: &'static str,
    function: ApiFunction,
}

#[derive(Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiToolCallFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ApiToolCallFunction {
    name: String,
    arguments: String,
}

// --- API Response Types ---

#[derive(Deserialize, Debug)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize, Debug)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

// --- Implementation ---

impl OpenAiClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CompletionError::from)?;
        Ok(Self {
            api_key,
            api_base,
            model,
            max_tokens: None,
            client,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Translate protocol messages into the wire format, prepending the
/// system instruction and dropping anything that would be malformed:
/// a tool message without its back-reference id cannot be sent.
fn build_wire_messages(messages: &[ProtocolMessage]) -> Vec<ApiMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    wire.push(ApiMessage {
        role: "system".to_string(),
        content: SYSTEM_PROMPT.to_string(),
        tool_calls: None,
        tool_call_id: None,
    });

    for msg in messages {
        match msg.role {
            Role::System | Role::User => wire.push(ApiMessage {
                role: role_name(msg.role).to_string(),
                content: msg.content.clone(),
                tool_calls: None,
                tool_call_id: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".to_string(),
                                function: ApiToolCallFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };
                // Content stays an empty string when the turn is only a
                // tool request; the protocol rejects null content.
                wire.push(ApiMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                    tool_calls,
                    tool_call_id: None,
                });
            }
            Role::Tool => {
                let Some(id) = &msg.tool_call_id else {
                    debug!("dropping tool message without tool_call_id");
                    continue;
                };
                wire.push(ApiMessage {
                    role: "tool".to_string(),
                    content: msg.content.clone(),
                    tool_calls: None,
                    tool_call_id: Some(id.clone()),
                });
            }
        }
    }
    wire
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn parse_api_response(response: ApiResponse) -> Result<ChatResponse, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("no choices returned".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
    })
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ProtocolMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, CompletionError> {
        let api_tools: Vec<ApiTool> = tools
            .iter()
            .map(|t| {
                Ok(ApiTool {
                    r#type: "function",
                    function: ApiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: serde_json::to_value(&t.parameters).map_err(|e| {
                            CompletionError::MalformedResponse(format!(
                                "unserializable tool schema for '{}': {e}",
                                t.name
                            ))
                        })?,
                    },
                })
            })
            .collect::<Result<_, CompletionError>>()?;

        let request = ApiRequest {
            model: self.model.clone(),
            messages: build_wire_messages(messages),
            temperature: 0.7,
            max_tokens: self.max_tokens,
            tool_choice: if api_tools.is_empty() { None } else { Some("auto") },
            tools: if api_tools.is_empty() {
                None
            } else {
                Some(api_tools)
            },
        };

        let url = format!(
            "{}/chat/completions",
            self.api_base.trim_end_matches('/')
        );
        debug!(url = %url, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parse_api_response(api_response)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
