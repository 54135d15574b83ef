//! Agent configuration: a TOML file with environment overrides.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::agent::DeliveryMatcher;
use crate::error::{AgentError, Result};
use crate::history::TrailingTurn;
use crate::memory::Strategy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub agent: AgentSettings,
    pub model: ModelConfig,
    pub memory: MemoryConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Memory-backed conversation.
    #[default]
    Chat,
    /// Plan and run gateway tools.
    Tools,
}

/// How stored history and the incoming turn are combined before a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Persist the new turn first, merge the whole log and close it with an empty
    /// assistant placeholder.
    #[default]
    StoredPlaceholder,
    /// Merge only what was stored before, then append the new user turn.
    AppendNewTurn,
}

impl HistoryPolicy {
    pub fn trailing(&self) -> TrailingTurn {
        match self {
            HistoryPolicy::StoredPlaceholder => TrailingTurn::AssistantPlaceholder,
            HistoryPolicy::AppendNewTurn => TrailingTurn::Open,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub mode: AgentMode,
    pub history: HistoryPolicy,
    pub default_session: String,
    pub system_prompt: String,
    /// Which gateway tools deliver a message (tools mode).
    pub delivery: DeliveryMatcher,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            mode: AgentMode::Chat,
            history: HistoryPolicy::StoredPlaceholder,
            default_session: "default_session".to_string(),
            system_prompt: "You are a helpful assistant. Use prior messages for context and respond only to the last user message.".to_string(),
            delivery: DeliveryMatcher::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model_id: String,
    pub api_key: Option<String>,
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/v1/messages".to_string(),
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            api_key: None,
            anthropic_version: "bedrock-2023-05-31".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: Some(0.9),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    #[default]
    Ephemeral,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    pub db_path: PathBuf,
    /// Per-session bound of the ephemeral store.
    pub max_events: usize,
    /// Sessions the ephemeral store keeps before evicting the least recently written.
    pub max_sessions: usize,
    /// How many recent events feed the merge.
    pub list_max_results: usize,
    pub actor_id: String,
    pub strategies: Vec<Strategy>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::Ephemeral,
            db_path: PathBuf::from("data/agent-memory.db"),
            max_events: 10,
            max_sessions: 1024,
            list_max_results: 50,
            actor_id: "USER".to_string(),
            strategies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: Option<String>,
    /// Pre-issued bearer token; takes precedence over the OAuth settings.
    pub token: Option<String>,
    pub oauth: Option<OAuthConfig>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl AgentConfig {
    /// Load from `path` if given, otherwise from `AGENT_CONFIG` if set, otherwise
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os("AGENT_CONFIG").map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(env_path);

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `lookup` is injected so tests don't touch the process environment.
    /// A value that is set but unparseable is an error, never silently ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("AGENT_BIND") {
            self.server.bind = bind.parse().map_err(|err| {
                AgentError::InvalidConfig(format!("AGENT_BIND {:?} is not a socket address: {}", bind, err))
            })?;
        }
        if let Some(endpoint) = lookup("MODEL_ENDPOINT") {
            self.model.endpoint = endpoint;
        }
        if let Some(model_id) = lookup("MODEL_ID") {
            self.model.model_id = model_id;
        }
        if let Some(key) = lookup("MODEL_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(path) = lookup("MEMORY_DB_PATH") {
            self.memory.db_path = PathBuf::from(path);
            self.memory.backend = MemoryBackend::Sqlite;
        }
        if let Some(url) = lookup("GATEWAY_URL") {
            self.gateway.url = Some(url);
        }
        if let Some(token) = lookup("GATEWAY_TOKEN") {
            self.gateway.token = Some(token);
        }

        let oauth = (
            lookup("OAUTH_TOKEN_URL"),
            lookup("OAUTH_CLIENT_ID"),
            lookup("OAUTH_CLIENT_SECRET"),
        );
        if let (Some(token_url), Some(client_id), Some(client_secret)) = oauth {
            self.gateway.oauth = Some(OAuthConfig {
                token_url,
                client_id,
                client_secret,
                scope: lookup("OAUTH_SCOPE").unwrap_or_default(),
            });
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.endpoint.trim().is_empty() {
            return Err(AgentError::InvalidConfig("model.endpoint is empty".to_string()));
        }
        if self.model.max_tokens == 0 {
            return Err(AgentError::InvalidConfig("model.max_tokens must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(AgentError::InvalidConfig(format!(
                "model.temperature must be within 0..=1, got {}",
                self.model.temperature
            )));
        }
        if self.memory.max_events == 0 || self.memory.max_sessions == 0 || self.memory.list_max_results == 0 {
            return Err(AgentError::InvalidConfig(
                "memory.max_events, memory.max_sessions and memory.list_max_results must be positive"
                    .to_string(),
            ));
        }
        if self.agent.default_session.trim().is_empty() {
            return Err(AgentError::InvalidConfig("agent.default_session is empty".to_string()));
        }
        if self.agent.mode == AgentMode::Tools && self.gateway.url.is_none() {
            return Err(AgentError::InvalidConfig(
                "tools mode requires gateway.url (or GATEWAY_URL)".to_string(),
            ));
        }
        if self.agent.mode == AgentMode::Tools && self.gateway.token.is_none() && self.gateway.oauth.is_none() {
            return Err(AgentError::InvalidConfig(
                "tools mode requires gateway.token or gateway.oauth".to_string(),
            ));
        }
        Ok(())
    }
}
