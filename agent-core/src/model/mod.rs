pub mod http;

pub use http::HttpModelClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::history::Message;

/// One inference call: merged messages plus system instruction and sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
            max_tokens: 512,
            temperature: 0.7,
            top_p: Some(0.9),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Take sampling parameters from configuration.
    pub fn with_sampling(mut self, config: &ModelConfig) -> Self {
        self.max_tokens = config.max_tokens;
        self.temperature = config.temperature;
        self.top_p = config.top_p;
        self
    }

    /// A single-prompt request, the shape used for planning and summaries.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Returns the generated text.
    async fn invoke(&self, request: &ModelRequest) -> Result<String>;
}
