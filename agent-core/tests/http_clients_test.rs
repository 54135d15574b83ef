/// Outbound HTTP clients against mock endpoints

use agent_core::client::AgentClient;
use agent_core::config::{GatewayConfig, ModelConfig, OAuthConfig};
use agent_core::error::AgentError;
use agent_core::gateway::{GatewayClient, ToolGateway};
use agent_core::history::Message;
use agent_core::model::{HttpModelClient, ModelClient, ModelRequest};
use agent_core::InvocationRequest;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, bearer_token, body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model_config(server: &MockServer) -> ModelConfig {
    ModelConfig {
        endpoint: format!("{}/v1/messages", server.uri()),
        model_id: "test-model".to_string(),
        api_key: Some("secret-key".to_string()),
        ..ModelConfig::default()
    }
}

#[tokio::test]
async fn test_model_client_sends_messages_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "secret-key"))
        .and(body_partial_json(json!({
            "anthropic_version": "bedrock-2023-05-31",
            "model": "test-model",
            "system": "Be brief.",
            "max_tokens": 512,
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": ""}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": "!"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpModelClient::new(&model_config(&server)).unwrap();
    let request = ModelRequest::new(vec![Message::user("hi"), Message::assistant("")])
        .with_system("Be brief.");

    assert_eq!(client.invoke(&request).await.unwrap(), "Hello!");
}

#[tokio::test]
async fn test_model_client_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = HttpModelClient::new(&model_config(&server)).unwrap();
    let err = client.invoke(&ModelRequest::prompt("hi")).await.unwrap_err();
    match err {
        AgentError::Model(message) => assert!(message.contains("slow down")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gateway_static_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(bearer_token("static-token"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": "tools/list"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"tools": [
                {"name": "weather", "description": "Current weather", "inputSchema": {"type": "object"}},
                {"name": "clock"}
            ]}
        })))
        .mount(&server)
        .await;

    let config = GatewayConfig {
        url: Some(format!("{}/mcp", server.uri())),
        token: Some("static-token".to_string()),
        ..GatewayConfig::default()
    };
    let gateway = GatewayClient::from_config(&config).unwrap();

    let tools = gateway.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["weather", "clock"]);
    assert_eq!(tools[0].input_schema, Some(json!({"type": "object"})));
    assert_eq!(tools[1].description, None);
}

#[tokio::test]
async fn test_gateway_client_credentials_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(basic_auth("client-id", "client-secret"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(bearer_token("fresh-token"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {"name": "weather", "arguments": {"city": "Oslo"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": "4 degrees"}]}
        })))
        .mount(&server)
        .await;

    let config = GatewayConfig {
        url: Some(format!("{}/mcp", server.uri())),
        oauth: Some(OAuthConfig {
            token_url: format!("{}/oauth2/token", server.uri()),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scope: "gateway/invoke".to_string(),
        }),
        ..GatewayConfig::default()
    };
    let gateway = GatewayClient::from_config(&config).unwrap();

    let result = gateway.call_tool("weather", &json!({"city": "Oslo"})).await.unwrap();
    assert_eq!(result, json!({"content": [{"type": "text", "text": "4 degrees"}]}));
}

#[tokio::test]
async fn test_gateway_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let config = GatewayConfig {
        url: Some(format!("{}/mcp", server.uri())),
        oauth: Some(OAuthConfig {
            token_url: format!("{}/oauth2/token", server.uri()),
            client_id: "client-id".to_string(),
            client_secret: "wrong".to_string(),
            scope: String::new(),
        }),
        ..GatewayConfig::default()
    };
    let gateway = GatewayClient::from_config(&config).unwrap();

    let err = gateway.list_tools().await.unwrap_err();
    assert!(matches!(err, AgentError::Authentication(_)));
}

#[tokio::test]
async fn test_gateway_json_rpc_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Unknown tool: stocks"}
        })))
        .mount(&server)
        .await;

    let config = GatewayConfig {
        url: Some(server.uri()),
        token: Some("t".to_string()),
        ..GatewayConfig::default()
    };
    let gateway = GatewayClient::from_config(&config).unwrap();

    let err = gateway.call_tool("stocks", &json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "Gateway error: tools/call failed: Unknown tool: stocks");
}

#[test]
fn test_gateway_requires_url_and_credentials() {
    let err = GatewayClient::from_config(&GatewayConfig::default()).err().unwrap();
    assert!(matches!(err, AgentError::InvalidConfig(_)));

    let config = GatewayConfig {
        url: Some("http://localhost:9000".to_string()),
        ..GatewayConfig::default()
    };
    let err = GatewayClient::from_config(&config).err().unwrap();
    assert!(matches!(err, AgentError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_agent_client_invoke() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invocations"))
        .and(body_partial_json(json!({"prompt": "hi", "session_id": "session-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hello!",
            "session_id": "session-1"
        })))
        .mount(&server)
        .await;

    let client = AgentClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    let response = client
        .invoke(&InvocationRequest::new("hi").with_session("session-1"))
        .await
        .unwrap();
    assert_eq!(response.message, "Hello!");
    assert_eq!(response.session_id, "session-1");
}

#[tokio::test]
async fn test_agent_client_surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invocations"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid input: Input is empty"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = AgentClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    assert!(client.ping().await.unwrap());

    let err = client.invoke(&InvocationRequest::new(" ")).await.unwrap_err();
    match err {
        AgentError::Remote { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid input: Input is empty");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
