//! Messages-API client over HTTP.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{ModelClient, ModelRequest};
use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::history::Message;

#[derive(Serialize)]
struct MessagesBody<'a> {
    anthropic_version: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_key: Option<String>,
    anthropic_version: String,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model_id: config.model_id.clone(),
            api_key: config.api_key.clone(),
            anthropic_version: config.anthropic_version.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<String> {
        let body = MessagesBody {
            anthropic_version: &self.anthropic_version,
            model: &self.model_id,
            system: request.system.as_deref(),
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        tracing::debug!(
            target: "model",
            model = %self.model_id,
            messages = request.messages.len(),
            "Invoking model"
        );

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!("{} from model endpoint: {}", status, detail)));
        }

        let document: Value = response.json().await?;
        Ok(extract_text(&document))
    }
}

/// Text blocks of a list `content` are concatenated; string content is returned
/// as is. Anything else comes back as the raw document so nothing is lost.
pub fn extract_text(document: &Value) -> String {
    match document.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) if !blocks.is_empty() => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => document.to_string(),
    }
}
