mod common;

use agent_core::agent::{AgentService, ChatAgent};
use agent_core::client::AgentClient;
use agent_core::memory::{InMemoryLongTermMemory, SessionMemory};
use agent_core::observability::MetricsCollector;
use agent_core::server::{router, AppState};
use agent_core::InvocationRequest;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{test_config, ScriptedModel};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(model: Arc<ScriptedModel>) -> Router {
    let config = test_config();
    let metrics = MetricsCollector::new().unwrap();
    let agent = ChatAgent::new(
        Arc::new(SessionMemory::new(10).unwrap()),
        Arc::new(InMemoryLongTermMemory::new()),
        model,
        &config,
    )
    .with_metrics(metrics.clone());
    let service = AgentService::new(Arc::new(agent), metrics, "default_session");

    router(
        AppState {
            service: Arc::new(service),
        },
        Duration::from_secs(5),
    )
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ping() {
    let response = app(Arc::new(ScriptedModel::default()))
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_invocation_round_trip() {
    let model = Arc::new(ScriptedModel::new(["Hi there"]));
    let response = app(model.clone())
        .oneshot(post_json("/invocations", r#"{"prompt": "hello", "session_id": "abc-1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Hi there", "session_id": "abc-1"})
    );
    assert_eq!(model.requests().len(), 1);
}

#[tokio::test]
async fn test_root_route_uses_default_session() {
    let response = app(Arc::new(ScriptedModel::new(["ok"])))
        .oneshot(post_json("/", r#"{"prompt": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["session_id"], "default_session");
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    let model = Arc::new(ScriptedModel::default());

    for body in [
        "not json",
        r#"{"session_id": "abc"}"#,
        r#"{"prompt": "hi", "input": "legacy field"}"#,
        r#"{"prompt": "   "}"#,
        r#"{"prompt": "hi", "session_id": "../etc"}"#,
    ] {
        let response = app(model.clone())
            .oneshot(post_json("/invocations", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(json_body(response).await["error"].is_string());
    }

    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_still_ok_response() {
    let response = app(Arc::new(ScriptedModel::failing("overloaded")))
        .oneshot(post_json("/invocations", r#"{"prompt": "hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "Error: Model error: overloaded"
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app(Arc::new(ScriptedModel::new(["one"])));
    app.clone()
        .oneshot(post_json("/invocations", r#"{"prompt": "hi"}"#))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("agent_invocations_total{agent=\"chat\",component=\"agent\"} 1"));
    assert!(text.contains("agent_model_calls_total 1"));
}

#[tokio::test]
async fn test_client_against_live_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(Arc::new(ScriptedModel::new(["first reply", "second reply"])));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = AgentClient::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    assert!(client.ping().await.unwrap());

    let first = client
        .invoke(&InvocationRequest::new("hello").with_session("live-1"))
        .await
        .unwrap();
    assert_eq!(first.message, "first reply");

    let second = client
        .invoke(&InvocationRequest::new("again").with_session("live-1"))
        .await
        .unwrap();
    assert_eq!(second.message, "second reply");
    assert_eq!(second.session_id, "live-1");
}
