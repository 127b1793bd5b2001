//! LlmClient against a local OpenAI-compatible stub: status mapping and continuation ids.

use std::time::Duration;

use anyhow::Result;
use axum::{Json, Router, http::StatusCode, routing::post};
use omni_relay::{CompletionError, CompletionGateway, CompletionRequest, LlmClient};
use omni_window::PromptMessage;
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn completions_ok(Json(body): Json<Value>) -> Json<Value> {
    let parent = body
        .get("parent_message_id")
        .and_then(Value::as_str)
        .unwrap_or("none")
        .to_string();
    let turns = body["messages"].as_array().map_or(0, Vec::len);
    Json(json!({
        "id": "chatcmpl-42",
        "choices": [{
            "message": {"role": "assistant", "content": format!("\n\nturns={turns} parent={parent}")}
        }]
    }))
}

async fn completions_throttled() -> (StatusCode, &'static str) {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn completions_broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn completions_empty() -> Json<Value> {
    Json(json!({"id": "x", "choices": []}))
}

async fn spawn_stub() -> Result<String> {
    let app = Router::new()
        .route("/ok", post(completions_ok))
        .route("/throttled", post(completions_throttled))
        .route("/broken", post(completions_broken))
        .route("/empty", post(completions_empty));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn client(base: &str, path: &str) -> LlmClient {
    LlmClient::new(
        format!("{base}{path}"),
        "test-model".to_string(),
        None,
        Duration::from_secs(5),
    )
}

fn request(parent_id: Option<&str>) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            PromptMessage::user("hello"),
            PromptMessage::assistant("hi"),
            PromptMessage::user("again"),
        ],
        parent_id: parent_id.map(str::to_string),
    }
}

#[tokio::test]
async fn successful_completion_is_normalized_and_carries_id() -> Result<()> {
    let base = spawn_stub().await?;
    let completion = client(&base, "/ok").submit(request(Some("prev-1"))).await?;
    assert_eq!(completion.text, "turns=3 parent=prev-1");
    assert_eq!(completion.parent_id.as_deref(), Some("chatcmpl-42"));
    Ok(())
}

#[tokio::test]
async fn absent_parent_id_is_not_sent() -> Result<()> {
    let base = spawn_stub().await?;
    let completion = client(&base, "/ok").submit(request(None)).await?;
    assert_eq!(completion.text, "turns=3 parent=none");
    Ok(())
}

#[tokio::test]
async fn http_429_maps_to_rate_limited() -> Result<()> {
    let base = spawn_stub().await?;
    let result = client(&base, "/throttled").submit(request(None)).await;
    assert!(matches!(result, Err(CompletionError::RateLimited)));
    Ok(())
}

#[tokio::test]
async fn other_failures_map_to_upstream() -> Result<()> {
    let base = spawn_stub().await?;
    let broken = client(&base, "/broken").submit(request(None)).await;
    assert!(matches!(broken, Err(CompletionError::Upstream(_))));
    let empty = client(&base, "/empty").submit(request(None)).await;
    assert!(matches!(empty, Err(CompletionError::Upstream(_))));
    let unreachable = client("http://127.0.0.1:1", "/ok").submit(request(None)).await;
    assert!(matches!(unreachable, Err(CompletionError::Upstream(_))));
    Ok(())
}
