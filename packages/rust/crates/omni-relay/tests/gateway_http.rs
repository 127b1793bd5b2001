//! HTTP gateway integration tests: validation (400), routing, response shape.
//! Uses a scripted gateway so no external services are required.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::body::to_bytes;
use axum::http::{Request, StatusCode};
use omni_relay::test_support::ScriptedGateway;
use omni_relay::{
    MessageRequest, Relay, RelayConfig, TurnStore, router, unsupported_message,
    validate_message_request,
};
use serde_json::Value;
use tower::ServiceExt;

fn test_relay(gateway: ScriptedGateway) -> Arc<Relay> {
    Arc::new(Relay::new(
        RelayConfig::default(),
        Arc::new(TurnStore::new()),
        Arc::new(gateway),
    ))
}

async fn post_message(relay: Arc<Relay>, body: &str) -> (StatusCode, Value) {
    let response = router(relay)
        .oneshot(
            Request::post("/message")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn gateway_returns_400_for_empty_session_id() {
    let (status, _) = post_message(
        test_relay(ScriptedGateway::new()),
        r#"{"session_id":"","message":"hi"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_returns_400_for_empty_message() {
    let (status, _) = post_message(
        test_relay(ScriptedGateway::new()),
        r#"{"session_id":"s1","message":"   "}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_relays_text_message() {
    let relay = test_relay(ScriptedGateway::new().answer(Duration::from_millis(5), "hi"));
    let (status, body) =
        post_message(relay, r#"{"session_id":"s1","message":"hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "hi");
    assert_eq!(body["session_id"], "s1");
}

#[tokio::test]
async fn gateway_answers_unsupported_types_without_core() {
    let relay = test_relay(ScriptedGateway::new());
    let (status, body) = post_message(
        Arc::clone(&relay),
        r#"{"session_id":"s1","msg_type":"voice"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], unsupported_message("voice"));
    assert_eq!(relay.store().len("s1").await.unwrap(), 0);
}

#[tokio::test]
async fn gateway_answers_subscribe_with_help() {
    let relay = test_relay(ScriptedGateway::new());
    let (status, body) = post_message(
        Arc::clone(&relay),
        r#"{"session_id":"s1","msg_type":"event","event":"subscribe"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], relay.help_message());
}

#[tokio::test]
async fn gateway_health_reports_deadline_and_backend() {
    let response = router(test_relay(ScriptedGateway::new()))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["deadline_ms"], 4000);
    assert_eq!(body["store_backend"], "memory");
}

#[tokio::test]
async fn gateway_returns_404_for_unknown_route() {
    let response = router(test_relay(ScriptedGateway::new()))
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn validation_rejects_unknown_message_type() {
    let body = MessageRequest {
        session_id: "s1".to_string(),
        message: "hi".to_string(),
        msg_type: Some("location".to_string()),
        event: None,
    };
    let error = validate_message_request(&body).unwrap_err();
    assert_eq!(error.0, StatusCode::BAD_REQUEST);
}
