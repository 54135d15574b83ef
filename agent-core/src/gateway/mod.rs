pub mod oauth;

pub use oauth::TokenSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::{AgentError, Result};

/// A tool advertised by the gateway's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// The JSON-RPC `result` member of the call.
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value>;
}

/// JSON-RPC 2.0 client for an MCP-style tool gateway.
pub struct GatewayClient {
    client: reqwest::Client,
    url: String,
    tokens: TokenSource,
}

impl GatewayClient {
    pub fn new(url: impl Into<String>, tokens: TokenSource, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            tokens,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| AgentError::InvalidConfig("gateway.url is not set".to_string()))?;
        let tokens = TokenSource::from_config(config)?;
        Self::new(url, tokens, Duration::from_secs(config.timeout_secs.unwrap_or(30)))
    }

    async fn rpc(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let token = self.tokens.fetch(&self.client).await?;

        let mut payload = json!({"jsonrpc": "2.0", "id": 1, "method": method});
        if let Some(params) = params {
            payload["params"] = params;
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Gateway(format!("{} returned {}: {}", method, status, detail)));
        }

        let mut body: Value = response.json().await?;
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(AgentError::Gateway(format!("{} failed: {}", method, message)));
        }

        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ToolGateway for GatewayClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let result = self.rpc("tools/list", None).await?;
        let tools = match result.get("tools") {
            Some(tools) => serde_json::from_value(tools.clone())?,
            None => Vec::new(),
        };
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value> {
        crate::log_tool!(info, name, args = %arguments, "Tool call");
        let result = self
            .rpc("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await?;
        crate::log_tool!(info, name, "Tool result");
        Ok(result)
    }
}
