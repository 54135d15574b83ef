//! Collapse a chronological turn log into a role-alternating message list.

use super::{Message, Role, TurnRecord};

/// What happens when the merged history ends on a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingTurn {
    /// Append an empty assistant message so the sequence closes on an assistant turn.
    #[default]
    AssistantPlaceholder,
    /// Leave the sequence as merged; the caller appends the new user turn itself.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    pub trailing: TrailingTurn,
}

impl MergeOptions {
    pub fn open() -> Self {
        Self {
            trailing: TrailingTurn::Open,
        }
    }
}

/// Merge with the default trailing-placeholder behaviour.
pub fn merge(records: &[TurnRecord]) -> Vec<Message> {
    merge_with(records, &MergeOptions::default())
}

/// Records with an unrecognized role are treated as absent: they neither produce
/// output nor split a run of same-role records.
pub fn merge_with(records: &[TurnRecord], options: &MergeOptions) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut current: Option<Role> = None;

    for record in records {
        let Some(role) = record.role() else {
            continue;
        };

        if let Some(previous) = current {
            if previous != role {
                merged.push(Message::new(previous, buffer.join("\n")));
                buffer.clear();
            }
        }

        buffer.push(&record.text);
        current = Some(role);
    }

    if let Some(role) = current {
        if !buffer.is_empty() {
            merged.push(Message::new(role, buffer.join("\n")));
        }
    }

    if options.trailing == TrailingTurn::AssistantPlaceholder {
        if let Some(last) = merged.last() {
            if last.role == Role::User {
                merged.push(Message::assistant(""));
            }
        }
    }

    merged
}

/// Add the incoming user input after merged history without breaking alternation.
/// A trailing placeholder is dropped and a trailing user message absorbs the input.
pub fn append_user_turn(messages: &mut Vec<Message>, input: &str) {
    if messages.last().map_or(false, Message::is_placeholder) {
        messages.pop();
    }

    match messages.last_mut() {
        Some(last) if last.role == Role::User => {
            last.content.push('\n');
            last.content.push_str(input);
        }
        _ => messages.push(Message::user(input)),
    }
}

/// A brand-new session has nothing stored; the model still needs the user's turn.
pub fn with_fallback(messages: Vec<Message>, input: &str) -> Vec<Message> {
    if messages.is_empty() {
        vec![Message::user(input)]
    } else {
        messages
    }
}
