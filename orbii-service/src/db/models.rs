//! Database model structs.
//!
//! This module contains the data structures persisted in the session store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message, as stored in history and sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-session chat state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_text: Option<String>,
}

impl SessionState {
    /// Keep only the most recent `max_entries` history entries
    pub fn truncate_history(&mut self, max_entries: usize) {
        if self.history.len() > max_entries {
            let excess = self.history.len() - max_entries;
            self.history.drain(..excess);
        }
    }

    /// Decode a stored state blob, migrating older layouts.
    ///
    /// - current: `{"history": [...], "studyText": "..."}`
    /// - legacy: a bare array of messages (no study text)
    ///
    /// Entries that are not valid messages are skipped; a non-array
    /// `history` is read as empty.
    pub fn from_stored(value: Value) -> Self {
        match value {
            Value::Array(entries) => Self {
                history: decode_messages(entries),
                study_text: None,
            },
            Value::Object(mut fields) => {
                let history = match fields.remove("history") {
                    Some(Value::Array(entries)) => decode_messages(entries),
                    _ => Vec::new(),
                };
                let study_text = match fields.remove("studyText") {
                    Some(Value::String(text)) => Some(text),
                    _ => None,
                };
                Self {
                    history,
                    study_text,
                }
            }
            _ => Self::default(),
        }
    }
}

fn decode_messages(entries: Vec<Value>) -> Vec<ChatMessage> {
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}
