//! Process-local session memory, lost on restart.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use super::{Event, EventStore};
use crate::error::{AgentError, Result};

pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct SessionLog {
    events: VecDeque<Event>,
    last_write: u64,
}

#[derive(Default)]
struct Sessions {
    logs: HashMap<String, SessionLog>,
    writes: u64,
}

/// Session-keyed event log bounded to the last `max_events` events per session
/// and to `max_sessions` sessions. Both bounds are enforced on write: the oldest
/// events of a session are dropped, and opening a session past the cap evicts the
/// session written least recently.
pub struct SessionMemory {
    sessions: RwLock<Sessions>,
    max_events: usize,
    max_sessions: usize,
}

impl SessionMemory {
    pub fn new(max_events: usize) -> Result<Self> {
        Self::bounded(max_events, DEFAULT_MAX_SESSIONS)
    }

    pub fn bounded(max_events: usize, max_sessions: usize) -> Result<Self> {
        if max_events == 0 || max_sessions == 0 {
            return Err(AgentError::InvalidConfig(
                "session memory must keep at least one event and one session".to_string(),
            ));
        }

        Ok(Self {
            sessions: RwLock::new(Sessions::default()),
            max_events,
            max_sessions,
        })
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.logs.len()
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            max_events: 10,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Sessions {
    fn evict_least_recent(&mut self) -> Option<String> {
        let oldest = self
            .logs
            .iter()
            .min_by_key(|(_, log)| log.last_write)
            .map(|(id, _)| id.clone())?;
        self.logs.remove(&oldest);
        Some(oldest)
    }
}

#[async_trait]
impl EventStore for SessionMemory {
    async fn create_event(&self, session_id: &str, actor_id: &str, text: &str) -> Result<Event> {
        let event = Event::new(session_id, actor_id, text);

        let mut sessions = self.sessions.write().await;
        if !sessions.logs.contains_key(session_id) && sessions.logs.len() >= self.max_sessions {
            if let Some(evicted) = sessions.evict_least_recent() {
                tracing::debug!(target: "memory", session_id = %evicted, "Evicted idle session");
            }
        }

        sessions.writes += 1;
        let write = sessions.writes;
        let log = sessions
            .logs
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLog {
                events: VecDeque::new(),
                last_write: write,
            });
        log.last_write = write;
        log.events.push_back(event.clone());
        while log.events.len() > self.max_events {
            log.events.pop_front();
        }

        tracing::debug!(target: "memory", session_id, event_id = %event.event_id, "Created event");
        Ok(event)
    }

    async fn list_events(&self, session_id: &str, max_results: Option<usize>) -> Result<Vec<Event>> {
        let sessions = self.sessions.read().await;
        let Some(log) = sessions.logs.get(session_id) else {
            return Ok(Vec::new());
        };

        let skip = max_results.map_or(0, |max| log.events.len().saturating_sub(max));
        Ok(log.events.iter().skip(skip).cloned().collect())
    }

    async fn delete_event(&self, session_id: &str, event_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(log) = sessions.logs.get_mut(session_id) else {
            return Ok(false);
        };

        let before = log.events.len();
        log.events.retain(|event| event.event_id != event_id);
        let removed = log.events.len() < before;

        if log.events.is_empty() {
            sessions.logs.remove(session_id);
        }

        Ok(removed)
    }
}
