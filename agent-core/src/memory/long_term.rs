//! Durable, namespace-scoped memories that outlive a session's event log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Query that matches every record in a namespace.
pub const MATCH_ALL: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    UserPreference,
    Semantic,
    Summarization,
    Episodic,
}

/// A configured extraction strategy and its identifier in the memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub id: String,
}

impl Strategy {
    pub fn new(kind: StrategyKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn actor_namespace(&self, actor_id: &str) -> String {
        format!("/strategies/{}/actors/{}", self.id, actor_id)
    }

    pub fn session_namespace(&self, actor_id: &str, session_id: &str) -> String {
        format!("{}/sessions/{}", self.actor_namespace(actor_id), session_id)
    }

    /// Namespaces this strategy reads from, in hydration order.
    ///
    /// Summaries and episodes are written per session; episodic strategies also
    /// keep cross-session reflections at the actor level.
    pub fn namespaces(&self, actor_id: &str, session_id: &str) -> Vec<String> {
        match self.kind {
            StrategyKind::UserPreference | StrategyKind::Semantic => {
                vec![self.actor_namespace(actor_id)]
            }
            StrategyKind::Summarization => vec![self.session_namespace(actor_id, session_id)],
            StrategyKind::Episodic => vec![
                self.session_namespace(actor_id, session_id),
                self.actor_namespace(actor_id),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub record_id: String,
    pub namespace: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(namespace: &str, text: &str) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            namespace: namespace.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query == MATCH_ALL || query.is_empty() || self.text.to_lowercase().contains(&query.to_lowercase())
    }
}

#[async_trait]
pub trait LongTermMemory: Send + Sync {
    async fn store_memory(&self, namespace: &str, text: &str) -> Result<MemoryRecord>;

    /// Records in `namespace` matching `query`, oldest first.
    async fn retrieve_memories(&self, namespace: &str, query: &str) -> Result<Vec<MemoryRecord>>;
}

/// Collect every durable fact visible to `actor_id` in `session_id`, one per line.
pub async fn hydrate_context(
    memory: &dyn LongTermMemory,
    strategies: &[Strategy],
    actor_id: &str,
    session_id: &str,
) -> Result<String> {
    let mut snippets = Vec::new();

    for strategy in strategies {
        for namespace in strategy.namespaces(actor_id, session_id) {
            let records = memory.retrieve_memories(&namespace, MATCH_ALL).await?;
            snippets.extend(records.into_iter().map(|r| r.text));
        }
    }

    tracing::debug!(target: "memory", facts = snippets.len(), "Hydrated durable context");
    Ok(snippets.join("\n"))
}

/// Durable memory held in process; pairs with the ephemeral session store.
#[derive(Default)]
pub struct InMemoryLongTermMemory {
    records: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl InMemoryLongTermMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LongTermMemory for InMemoryLongTermMemory {
    async fn store_memory(&self, namespace: &str, text: &str) -> Result<MemoryRecord> {
        let record = MemoryRecord::new(namespace, text);
        self.records
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn retrieve_memories(&self, namespace: &str, query: &str) -> Result<Vec<MemoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(namespace)
            .map(|list| list.iter().filter(|r| r.matches(query)).cloned().collect())
            .unwrap_or_default())
    }
}
