//! Core data types used throughout whisperfunc.
//!
//! Two representations of a conversation live side by side:
//!
//! - [`ConversationMessage`] is the outward-facing history: what the user
//!   and assistant said, with the tool-call trace attached to assistant
//!   turns. This is what gets persisted and returned over HTTP.
//! - [`ProtocolMessage`] is the wire-shaped message exchanged with the
//!   completion service: system/user/assistant/tool roles, raw tool-call
//!   requests, back-reference ids. It is short-lived and owned by the
//!   completion client and orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::SchemaNode;

// --- Message Roles ---

/// The role of a message on the completion wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

// --- Tool Call Request ---

/// A tool invocation requested by the model.
///
/// `arguments` is the JSON-encoded blob exactly as the service sent it;
/// it is parsed just before dispatch so a malformed blob can be turned
/// into a failed call record instead of aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque request id, echoed back in the tool-result turn
    pub id: String,
    /// Name of the tool to invoke (e.g. "get_current_time")
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

// --- Tool Call Record ---

/// Lifecycle state of one tool invocation attempt.
///
/// Progression is monotonic: pending -> executing -> completed | failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }
}

/// The structured, status-tracked result of one tool invocation.
///
/// Created the instant an invocation is requested, mutated exactly once
/// by the registry's execution path, then immutable for the rest of the
/// session. `result` is present iff completed, `error` iff failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the executing state, in milliseconds
    #[serde(
        rename = "executionTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time_ms: Option<u64>,
}

impl ToolCallRecord {
    /// Create a fresh record in the pending state.
    pub fn pending(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            timestamp: Utc::now(),
            status: CallStatus::Pending,
            result: None,
            error: None,
            execution_time_ms: None,
        }
    }

    /// Create a record that is already terminal-failed, e.g. for a
    /// request whose argument blob could not be parsed.
    pub fn failed(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            timestamp: Utc::now(),
            status: CallStatus::Failed,
            result: None,
            error: Some(error.into()),
            execution_time_ms: None,
        }
    }

    /// Transition pending -> executing. No-op once past pending.
    pub fn begin_execution(&mut self) {
        if self.status == CallStatus::Pending {
            self.status = CallStatus::Executing;
        }
    }

    /// Transition executing -> completed. No-op in a terminal state.
    pub fn complete(&mut self, result: serde_json::Value, elapsed_ms: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = CallStatus::Completed;
        self.result = Some(result);
        self.execution_time_ms = Some(elapsed_ms);
    }

    /// Transition executing -> failed. No-op in a terminal state.
    pub fn fail(&mut self, error: impl Into<String>, elapsed_ms: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = CallStatus::Failed;
        self.error = Some(error.into());
        self.execution_time_ms = Some(elapsed_ms);
    }
}

// --- Tool Definition ---

/// Describes a tool's interface as offered to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Schema of the accepted arguments object
    pub parameters: SchemaNode,
}

// --- Conversation Messages ---

/// A single message in the user-visible conversation history.
///
/// Invariant: only assistant messages carry `tool_calls`, in invocation
/// order within that turn. Messages are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: vec![],
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls,
        }
    }
}

// --- Protocol Messages ---

/// A wire-shaped message exchanged with the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub role: Role,
    pub content: String,
    /// If the assistant requested tools, this is non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For tool-result messages, links back to the request id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ProtocolMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    /// An assistant turn that issued tool requests. Content may be empty
    /// but is always a string, never absent: the wire distinguishes
    /// "no text, just a tool request" from missing content.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

// --- Completion Response ---

/// The interpreted response from one completion round.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant text content (may be empty if only tool calls)
    pub content: String,
    /// Tool invocations the model requested, in request order
    pub tool_calls: Vec<ToolCallRequest>,
    /// The service's finish reason ("stop", "tool_calls", ...)
    pub finish_reason: String,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// --- Turn Outcome ---

/// The result of one full orchestration turn: the final user-visible
/// message plus every tool call performed along the way, in order.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub content: String,
    #[serde(rename = "functionCalls", skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<ToolCallRecord>,
    #[serde(rename = "finishReason")]
    pub finish_reason: String,
}
