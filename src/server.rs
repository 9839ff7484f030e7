//! HTTP surface — the chat endpoint the front end talks to.
//!
//! `POST /api/chat` takes `{"messages": [{"role", "content"}]}` and
//! returns `{"message": {...}, "functionCalls": [...], "finishReason"}`.
//! Malformed input is rejected with 400 before orchestration begins; a
//! first-round completion failure surfaces as 500. Both error shapes
//! are `{"error", "message"}`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::TurnError;
use crate::orchestrator::Orchestrator;
use crate::types::{ProtocolMessage, ToolCallRecord};

pub struct AppState {
    pub orchestrator: Orchestrator,
}

#[derive(Deserialize)]
pub struct ChatApiRequest {
    messages: Option<Vec<IncomingMessage>>,
}

#[derive(Deserialize)]
struct IncomingMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct OutgoingMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatApiResponse {
    message: OutgoingMessage,
    #[serde(rename = "functionCalls", skip_serializing_if = "Vec::is_empty")]
    function_calls: Vec<ToolCallRecord>,
    #[serde(rename = "finishReason")]
    finish_reason: String,
}

#[derive(Serialize)]
pub struct ApiError {
    error: String,
    message: String,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: "Invalid messages format".to_string(),
            message: message.into(),
        }),
    )
}

/// Translate the incoming message list into protocol messages.
/// Unknown roles and null content are rejected, not silently sent.
fn map_incoming(messages: &[IncomingMessage]) -> Result<Vec<ProtocolMessage>, String> {
    if messages.is_empty() {
        return Err("messages must be a non-empty array".to_string());
    }
    messages
        .iter()
        .map(|msg| {
            let content = msg
                .content
                .as_deref()
                .ok_or_else(|| format!("message with role '{}' has no content", msg.role))?;
            match msg.role.as_str() {
                "user" => Ok(ProtocolMessage::user(content)),
                "assistant" => Ok(ProtocolMessage::assistant(content)),
                "system" => Ok(ProtocolMessage::system(content)),
                other => Err(format!("unsupported message role: '{other}'")),
            }
        })
        .collect()
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatApiRequest>, JsonRejection>,
) -> Result<Json<ChatApiResponse>, (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.to_string()))?;

    let messages = request
        .messages
        .ok_or_else(|| bad_request("missing 'messages' field"))?;
    let history = map_incoming(&messages).map_err(bad_request)?;

    match state.orchestrator.run_turn(history).await {
        Ok(outcome) => Ok(Json(ChatApiResponse {
            message: OutgoingMessage {
                role: "assistant",
                content: outcome.content,
            },
            function_calls: outcome.function_calls,
            finish_reason: outcome.finish_reason,
        })),
        Err(TurnError::InvalidInput(message)) => Err(bad_request(message)),
        Err(e) => {
            warn!(error = %e, "POST /api/chat failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: "Internal server error".to_string(),
                    message: e.to_string(),
                }),
            ))
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    info!("whisperfunc listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
