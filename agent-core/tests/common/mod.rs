#![allow(dead_code)]

use agent_core::config::AgentConfig;
use agent_core::error::{AgentError, Result};
use agent_core::gateway::{ToolDefinition, ToolGateway};
use agent_core::model::{ModelClient, ModelRequest};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Model double replaying canned replies and recording every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let model = Self::default();
        model
            .replies
            .lock()
            .unwrap()
            .push_back(Err(AgentError::Model(message.to_string())));
        model
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn invoke(&self, request: &ModelRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Model("no scripted reply left".to_string())))
    }
}

/// Gateway double with a fixed tool list; `fails` names tools whose calls error.
pub struct FakeGateway {
    pub tools: Vec<ToolDefinition>,
    pub fails: Vec<String>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeGateway {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|name| ToolDefinition {
                    name: name.to_string(),
                    description: Some(format!("{} tool", name)),
                    input_schema: None,
                })
                .collect(),
            fails: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolGateway for FakeGateway {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if self.fails.iter().any(|f| f == name) {
            return Err(AgentError::Gateway(format!("{} is down", name)));
        }
        Ok(json!({"content": [{"type": "text", "text": format!("{} ok", name)}]}))
    }
}

pub fn test_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.agent.system_prompt = "Be brief.".to_string();
    config
}
