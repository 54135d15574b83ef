pub mod merge;

pub use merge::{append_user_turn, merge, merge_with, with_fallback, MergeOptions, TrailingTurn};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::memory::Event;

/// Speaker of a turn once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Case-insensitive but otherwise exact: a padded tag such as `" user "` is
    /// unrecognized, like anything else that is not `user` or `assistant`.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Actor tag used when writing events to the memory store.
    pub fn actor_id(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored conversational turn, exactly as the memory store returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: String,
    pub text: String,
}

impl TurnRecord {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

impl From<&Message> for TurnRecord {
    fn from(message: &Message) -> Self {
        TurnRecord::new(message.role.as_str(), message.content.clone())
    }
}

/// One entry of the sequence handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The empty assistant turn appended after a trailing user message.
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.content.is_empty()
    }
}

/// Flatten stored events into turn records, keeping payload order within each event.
pub fn records_from_events(events: &[Event]) -> Vec<TurnRecord> {
    events
        .iter()
        .flat_map(|event| event.payload.iter())
        .map(|item| TurnRecord::new(item.role.clone(), item.text.clone()))
        .collect()
}
