use thiserror::Error;
use sqlx::Error as SqlxError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

use crate::security::ValidationError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Storage error: {0}")]
    Storage(#[from] SqlxError),

    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Agent server returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AgentError {
    /// True when the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AgentError::InvalidInput(_))
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
