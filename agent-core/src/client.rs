//! Client for a running agent server.

use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::agent::{InvocationRequest, InvocationResponse};
use crate::error::{AgentError, Result};

pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResponse> {
        let url = format!("{}/invocations", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no error detail")
                .to_string();
            return Err(AgentError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn ping(&self) -> Result<bool> {
        let url = format!("{}/ping", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

/// A fresh session id for one chat run: `session-` plus 32 hex digits.
pub fn new_session_id() -> String {
    format!("session-{}", Uuid::new_v4().simple())
}
