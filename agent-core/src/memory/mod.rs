pub mod ephemeral;
pub mod long_term;
pub mod storage;

pub use ephemeral::SessionMemory;
pub use long_term::{
    hydrate_context, InMemoryLongTermMemory, LongTermMemory, MemoryRecord, Strategy, StrategyKind,
};
pub use storage::SqliteEventStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// One role-tagged text payload inside a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversational {
    pub role: String,
    pub text: String,
}

impl Conversational {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

/// A timestamped, actor-tagged entry of a session's short-term event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub session_id: String,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Vec<Conversational>,
}

impl Event {
    /// A single-message event where the actor also speaks the payload.
    pub fn new(session_id: &str, actor_id: &str, text: &str) -> Self {
        let actor = actor_id.to_uppercase();
        Self {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            payload: vec![Conversational::new(actor.clone(), text)],
            actor_id: actor,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only short-term memory keyed by session.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, session_id: &str, actor_id: &str, text: &str) -> Result<Event>;

    /// The most recent `max_results` events (all when `None`), oldest first.
    async fn list_events(&self, session_id: &str, max_results: Option<usize>) -> Result<Vec<Event>>;

    /// Returns false when the event did not exist.
    async fn delete_event(&self, session_id: &str, event_id: &str) -> Result<bool>;

    /// Delete every event of a session, returning how many were removed.
    async fn clear_session(&self, session_id: &str) -> Result<usize> {
        let events = self.list_events(session_id, None).await?;
        let mut deleted = 0;
        for event in events {
            if self.delete_event(session_id, &event.event_id).await? {
                deleted += 1;
            }
        }
        tracing::info!(target: "memory", session_id, deleted, "Session events cleared");
        Ok(deleted)
    }
}
