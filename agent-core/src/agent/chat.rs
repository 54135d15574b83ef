//! Memory-backed conversational agent.

use async_trait::async_trait;
use std::sync::Arc;

use super::Agent;
use crate::config::{AgentConfig, HistoryPolicy, ModelConfig};
use crate::error::Result;
use crate::history::{self, MergeOptions, Message, Role};
use crate::memory::{hydrate_context, EventStore, LongTermMemory, Strategy};
use crate::model::{ModelClient, ModelRequest};
use crate::observability::MetricsCollector;

/// Conversational agent: merges the session's stored turns into the model input
/// and writes both sides of the exchange back to the event log.
pub struct ChatAgent {
    events: Arc<dyn EventStore>,
    long_term: Arc<dyn LongTermMemory>,
    model: Arc<dyn ModelClient>,
    model_config: ModelConfig,
    policy: HistoryPolicy,
    system_prompt: String,
    actor_id: String,
    list_max_results: usize,
    strategies: Vec<Strategy>,
    metrics: Option<MetricsCollector>,
}

impl ChatAgent {
    pub fn new(
        events: Arc<dyn EventStore>,
        long_term: Arc<dyn LongTermMemory>,
        model: Arc<dyn ModelClient>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            events,
            long_term,
            model,
            model_config: config.model.clone(),
            policy: config.agent.history,
            system_prompt: config.agent.system_prompt.clone(),
            actor_id: config.memory.actor_id.clone(),
            list_max_results: config.memory.list_max_results,
            strategies: config.memory.strategies.clone(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn durable_context(&self, session_id: &str) -> Result<String> {
        hydrate_context(self.long_term.as_ref(), &self.strategies, &self.actor_id, session_id).await
    }

    async fn reset(&self, session_id: &str) -> Result<String> {
        let deleted = self.events.clear_session(session_id).await?;
        let durable = self.durable_context(session_id).await?;
        tracing::info!(target: "agent", session_id, deleted, "Short-term memory reset");

        if durable.is_empty() {
            Ok("Memory reset. Let's start fresh!".to_string())
        } else {
            Ok(format!(
                "Memory reset. Durable context remains:\n{}",
                durable
            ))
        }
    }

    /// Build the model input from stored history according to the policy.
    async fn history(&self, session_id: &str, prompt: &str) -> Result<Vec<Message>> {
        let options = MergeOptions {
            trailing: self.policy.trailing(),
        };

        match self.policy {
            HistoryPolicy::StoredPlaceholder => {
                self.events
                    .create_event(session_id, Role::User.actor_id(), prompt)
                    .await?;
                let stored = self
                    .events
                    .list_events(session_id, Some(self.list_max_results))
                    .await?;
                let merged = history::merge_with(&history::records_from_events(&stored), &options);
                Ok(history::with_fallback(merged, prompt))
            }
            HistoryPolicy::AppendNewTurn => {
                let stored = self
                    .events
                    .list_events(session_id, Some(self.list_max_results))
                    .await?;
                let mut merged = history::merge_with(&history::records_from_events(&stored), &options);
                history::append_user_turn(&mut merged, prompt);
                Ok(merged)
            }
        }
    }

    fn system_prompt(&self, durable: &str) -> String {
        if durable.is_empty() {
            self.system_prompt.clone()
        } else {
            format!("{}\n\nDurable facts:\n{}", self.system_prompt, durable)
        }
    }
}

/// `reset` as the first word, any case.
fn is_reset_command(prompt: &str) -> bool {
    prompt
        .split_whitespace()
        .next()
        .map_or(false, |cmd| cmd.eq_ignore_ascii_case("reset"))
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn respond(&self, session_id: &str, prompt: &str) -> Result<String> {
        if is_reset_command(prompt) {
            return self.reset(session_id).await;
        }

        let messages = self.history(session_id, prompt).await?;
        let durable = self.durable_context(session_id).await?;

        tracing::debug!(
            target: "agent",
            session_id,
            messages = messages.len(),
            durable_facts = !durable.is_empty(),
            "Merged conversation history"
        );

        let request = ModelRequest::new(messages)
            .with_system(self.system_prompt(&durable))
            .with_sampling(&self.model_config);

        if let Some(metrics) = &self.metrics {
            metrics.record_model_call();
        }
        let reply = self.model.invoke(&request).await?;

        if self.policy == HistoryPolicy::AppendNewTurn {
            self.events
                .create_event(session_id, Role::User.actor_id(), prompt)
                .await?;
        }
        // an empty stored reply would read back as a closing placeholder
        if reply.trim().is_empty() {
            tracing::warn!(target: "agent", session_id, "Model returned no text; reply not stored");
        } else {
            self.events
                .create_event(session_id, Role::Assistant.actor_id(), &reply)
                .await?;
        }

        Ok(reply)
    }
}
