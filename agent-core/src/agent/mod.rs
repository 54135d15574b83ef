pub mod chat;
pub mod tools;

pub use chat::ChatAgent;
pub use tools::{DeliveryMatcher, ToolAgent};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AgentConfig, AgentMode, MemoryBackend};
use crate::error::Result;
use crate::gateway::GatewayClient;
use crate::memory::{EventStore, InMemoryLongTermMemory, LongTermMemory, SessionMemory, SqliteEventStore};
use crate::model::{HttpModelClient, ModelClient};
use crate::observability::{InvocationMetrics, MetricsCollector};
use crate::security::{validate_input, validate_session_id, ValidationError, MAX_PROMPT_LENGTH};

/// Body of `POST /invocations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvocationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate_input(&self.prompt, MAX_PROMPT_LENGTH)?;
        if let Some(session_id) = &self.session_id {
            validate_session_id(session_id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub message: String,
    pub session_id: String,
}

/// A request handler producing the reply text for one prompt.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Label used for metrics and logs.
    fn name(&self) -> &'static str;

    async fn respond(&self, session_id: &str, prompt: &str) -> Result<String>;
}

/// Validates requests, runs the agent and turns its failures into replies.
pub struct AgentService {
    agent: Arc<dyn Agent>,
    metrics: MetricsCollector,
    default_session: String,
}

impl AgentService {
    pub fn new(agent: Arc<dyn Agent>, metrics: MetricsCollector, default_session: impl Into<String>) -> Self {
        Self {
            agent,
            metrics,
            default_session: default_session.into(),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Only malformed input is an `Err`; store, model and gateway failures are
    /// logged and reported back as the reply text.
    pub async fn invoke(&self, request: InvocationRequest) -> Result<InvocationResponse> {
        request.validate()?;
        let session_id = request
            .session_id
            .unwrap_or_else(|| self.default_session.clone());

        crate::log_invocation!(info, session_id.as_str(), agent = self.agent.name(), "Invocation received");

        self.metrics.increment_active();
        let start = Instant::now();
        let outcome = self.agent.respond(&session_id, &request.prompt).await;
        let elapsed = start.elapsed();
        self.metrics.decrement_active();

        let (message, success) = match outcome {
            Ok(reply) => (reply, true),
            Err(err) => {
                crate::log_invocation!(error, session_id.as_str(), error = %err, "Invocation failed");
                (format!("Error: {}", err), false)
            }
        };

        self.metrics.record_invocation(InvocationMetrics {
            agent: self.agent.name(),
            duration_ms: duration_ms(elapsed),
            success,
        });

        Ok(InvocationResponse { message, session_id })
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Wire the configured agent to its collaborators.
pub async fn build_service(config: &AgentConfig, metrics: MetricsCollector) -> Result<AgentService> {
    let model: Arc<dyn ModelClient> = Arc::new(HttpModelClient::new(&config.model)?);

    let agent: Arc<dyn Agent> = match config.agent.mode {
        AgentMode::Chat => {
            let (events, long_term): (Arc<dyn EventStore>, Arc<dyn LongTermMemory>) =
                match config.memory.backend {
                    MemoryBackend::Ephemeral => (
                        Arc::new(SessionMemory::bounded(
                            config.memory.max_events,
                            config.memory.max_sessions,
                        )?),
                        Arc::new(InMemoryLongTermMemory::new()),
                    ),
                    MemoryBackend::Sqlite => {
                        let store = Arc::new(SqliteEventStore::new(&config.memory.db_path).await?);
                        (store.clone(), store)
                    }
                };

            tracing::info!(
                target: "agent",
                backend = ?config.memory.backend,
                history = ?config.agent.history,
                strategies = config.memory.strategies.len(),
                "Chat agent ready"
            );

            Arc::new(
                ChatAgent::new(events, long_term, model, config)
                    .with_metrics(metrics.clone()),
            )
        }
        AgentMode::Tools => {
            let gateway = Arc::new(GatewayClient::from_config(&config.gateway)?);
            tracing::info!(target: "agent", "Tool agent ready");
            Arc::new(
                ToolAgent::new(gateway, model, &config.model)
                    .with_delivery(config.agent.delivery.clone())
                    .with_metrics(metrics.clone()),
            )
        }
    };

    Ok(AgentService::new(agent, metrics, config.agent.default_session.clone()))
}
