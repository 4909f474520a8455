//! Per-connection conversational context.
//!
//! A `Context` is created when a connection sends `init`, grows by one
//! user/assistant pair per `query`, is replaced wholesale by
//! `context_update`, and is dropped when the connection closes.

use serde::{Deserialize, Serialize};

/// Model identifier used when `init` carries no context.
pub const DEFAULT_MODEL_ID: &str = "default-model";

/// The role of a history entry's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The connected client
    User,
    /// The model behind the server
    Assistant,
}

/// One turn of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    /// Wall-clock milliseconds at append time.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
        }
    }
}

/// Conversational state owned by exactly one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Opaque model identifier, echoed in response metadata.
    pub model_id: String,

    /// Default generation options (`temperature`, `maxTokens`, ...).
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,

    /// Chronological, append-only during normal operation.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Context {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            parameters: serde_json::Map::new(),
            history: Vec::new(),
        }
    }

    /// Set a generation parameter (builder style).
    pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Append a completed query exchange: the user turn, then the assistant turn.
    pub fn record_exchange(&mut self, user: HistoryEntry, assistant: HistoryEntry) {
        debug_assert_eq!(user.role, Role::User);
        debug_assert_eq!(assistant.role, Role::Assistant);
        self.history.push(user);
        self.history.push(assistant);
    }

    /// The most recent entry, if any.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ID)
    }
}
