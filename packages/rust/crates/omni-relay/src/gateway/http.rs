//! HTTP gateway: POST /message → relay turn → JSON response.
//!
//! Request validation (400 for empty session_id or empty text message). The relay always
//! answers within its deadline, so no extra per-request timeout is applied here.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::observability::RelayEvent;
use crate::relay::{InboundTurn, Relay, unsupported_message};

/// Message types answered with a fixed "not supported" reply.
const UNSUPPORTED_MESSAGE_TYPES: [&str; 5] = ["image", "voice", "video", "music", "news"];

/// Request body for POST /message.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Conversation session identifier.
    pub session_id: String,
    /// User message text. May be empty for non-text message types.
    #[serde(default)]
    pub message: String,
    /// Transport message type (`text` when absent).
    #[serde(default)]
    pub msg_type: Option<String>,
    /// Transport event name, e.g. `subscribe`.
    #[serde(default)]
    pub event: Option<String>,
}

/// Response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Relay reply text.
    pub output: String,
    /// Session identifier (echo of request).
    pub session_id: String,
}

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct GatewayState {
    /// Orchestrator shared by all requests.
    pub relay: Arc<Relay>,
}

/// Response body for gateway health endpoint.
#[derive(Debug, Serialize)]
pub struct GatewayHealthResponse {
    /// Always `healthy` while the server answers.
    pub status: &'static str,
    /// Placeholder deadline in milliseconds.
    pub deadline_ms: u64,
    /// `memory` or `valkey`.
    pub store_backend: &'static str,
}

/// What a validated request asks the gateway to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Plain text for the relay core.
    Text(String),
    /// Non-text message type; answered without touching the core.
    Unsupported(String),
    /// Subscription event; answered with the help text.
    Subscribe,
}

/// Validate request body; returns error for empty session_id or empty text message.
pub fn validate_message_request(
    body: &MessageRequest,
) -> Result<(String, InboundMessage), (StatusCode, String)> {
    let session_id = body.session_id.trim().to_string();
    if session_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "session_id must be non-empty".to_string(),
        ));
    }
    if body
        .event
        .as_deref()
        .is_some_and(|event| event.trim().eq_ignore_ascii_case("subscribe"))
    {
        return Ok((session_id, InboundMessage::Subscribe));
    }
    let msg_type = body
        .msg_type
        .as_deref()
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .unwrap_or("text")
        .to_ascii_lowercase();
    if UNSUPPORTED_MESSAGE_TYPES.contains(&msg_type.as_str()) {
        return Ok((session_id, InboundMessage::Unsupported(msg_type)));
    }
    if msg_type != "text" {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unknown msg_type `{msg_type}`"),
        ));
    }
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "message must be non-empty".to_string(),
        ));
    }
    Ok((session_id, InboundMessage::Text(message)))
}

async fn handle_message(
    State(state): State<GatewayState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let (session_id, inbound) = validate_message_request(&body)?;
    let output = match inbound {
        InboundMessage::Text(text) => {
            state
                .relay
                .handle(InboundTurn::now(session_id.as_str(), text))
                .await
                .text
        }
        InboundMessage::Unsupported(kind) => unsupported_message(&kind),
        InboundMessage::Subscribe => state.relay.help_message(),
    };
    Ok(Json(MessageResponse { output, session_id }))
}

async fn handle_health(State(state): State<GatewayState>) -> Json<GatewayHealthResponse> {
    Json(GatewayHealthResponse {
        status: "healthy",
        deadline_ms: state.relay.config().deadline_ms,
        store_backend: state.relay.store().backend_name(),
    })
}

/// Build the gateway router (POST /message, GET /health).
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/message", post(handle_message))
        .with_state(GatewayState { relay })
}

/// Run the HTTP server; binds to `bind_addr` (e.g. `0.0.0.0:8080`).
/// Graceful shutdown on Ctrl+C (SIGINT) and SIGTERM (Unix); in-flight requests complete
/// before exit. Detached completions still running at that point are dropped with the runtime.
pub async fn run_http(relay: Arc<Relay>, bind_addr: &str) -> Result<()> {
    let deadline_ms = relay.config().deadline_ms;
    let store_backend = relay.store().backend_name();
    let app = router(relay);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind gateway on {bind_addr}"))?;
    tracing::info!(
        event = RelayEvent::GatewayListening.as_str(),
        bind_addr,
        deadline_ms,
        store_backend,
        "gateway listening (Ctrl+C/SIGTERM to stop)"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!(event = RelayEvent::GatewayStopped.as_str(), "gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to listen for SIGTERM; Ctrl+C only");
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "failed to listen for Ctrl+C");
        }
    }
}
