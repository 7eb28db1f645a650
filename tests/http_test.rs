//! 触发器 HTTP 入口测试（tower oneshot，不监听端口）

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use push_relay::auth::TriggerSecret;
use push_relay::config::DeliveryConfig;
use push_relay::http::TriggerHttpServer;
use push_relay::push::MockProvider;
use push_relay::repository::InMemoryUserRepository;
use push_relay::server::build_dispatcher;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(secret: Option<&str>) -> Router {
    let dispatcher = build_dispatcher(
        Arc::new(DeliveryConfig::default()),
        Arc::new(MockProvider),
        Arc::new(InMemoryUserRepository::default()),
    );
    TriggerHttpServer::new(
        Arc::new(dispatcher),
        TriggerSecret::new(secret.map(str::to_string)),
        "127.0.0.1:0".to_string(),
    )
    .router()
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn trigger(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_notification_trigger() {
    let (status, body) = call(
        router(None),
        trigger(
            "/triggers/notifications/n1",
            r#"{"tokens":["t1","t2"],"title":"Hi","body":"There","type":"chat"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "sentCount": 2 }));
}

#[tokio::test]
async fn test_empty_body_is_missing_snapshot() {
    let (status, body) = call(router(None), trigger("/triggers/notifications/n1", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = call(router(None), trigger("/triggers/announcements/a1", "null")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_announcement_trigger() {
    let (status, body) = call(
        router(None),
        trigger(
            "/triggers/announcements/a1",
            r#"{"name":"Maintenance","isImportant":true}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_unknown_collection_is_404() {
    let (status, body) = call(router(None), trigger("/triggers/chats/c1", "{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let (status, body) = call(router(None), trigger("/triggers/notifications/n1", "{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_trigger_secret() {
    let (status, _) = call(
        router(Some("s3cret")),
        trigger("/triggers/notifications/n1", r#"{"tokens":["t1"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/triggers/notifications/n1")
        .header("x-trigger-secret", "wrong")
        .body(Body::from(r#"{"tokens":["t1"]}"#))
        .unwrap();
    let (status, _) = call(router(Some("s3cret")), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/triggers/notifications/n1")
        .header("x-trigger-secret", "s3cret")
        .header("x-event-id", "evt-1")
        .body(Body::from(r#"{"tokens":["t1"]}"#))
        .unwrap();
    let (status, body) = call(router(Some("s3cret")), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "sentCount": 1 }));
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(router(None), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let app = router(None);
    let response = app.oneshot(request).await.unwrap();
    // 测试进程中未安装 Recorder
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
