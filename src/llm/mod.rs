//! Completion service client.
//!
//! [`CompletionBackend`] abstracts the external model endpoint so the
//! orchestrator can be driven by the real OpenAI-compatible client or a
//! scripted fake in tests. The backend owns the translation between
//! protocol messages and the provider wire format; it does not retry.
//! Retry policy, if any, belongs to the caller.

pub mod openai;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::types::{ChatResponse, ProtocolMessage, ToolDefinition};

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One blocking completion round: conversation + tool catalog in,
    /// assistant text and/or tool-call requests out.
    async fn chat(
        &self,
        messages: &[ProtocolMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, CompletionError>;

    /// Display name for logging.
    fn name(&self) -> &str;
}
