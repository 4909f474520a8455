//! Error types for the ctxlink protocol.
//!
//! Uses `thiserror` for ergonomic error definitions. `ProtocolError` is the
//! taxonomy a client can observe: every variant maps to a short error code
//! and is delivered as an `error` message, never as a dropped connection.

use thiserror::Error;

use crate::message::ErrorPayload;

/// Machine-readable error codes carried in `ErrorPayload::code`.
pub mod codes {
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    pub const UNKNOWN_MESSAGE_TYPE: &str = "UNKNOWN_MESSAGE_TYPE";
    pub const NO_CONTEXT: &str = "NO_CONTEXT";
    pub const UNSUPPORTED_VERSION: &str = "UNSUPPORTED_VERSION";
    pub const MODEL_ERROR: &str = "MODEL_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// A failure of a single message exchange.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// The frame did not parse as a message of the expected shape.
    #[error("Invalid message: {detail}")]
    InvalidMessage { detail: String },

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A known type that only flows server → client (`response`, `error`).
    #[error("Unexpected message type: {0} is only sent by the server")]
    UnexpectedMessageType(String),

    #[error("No active context found. Please initialize first.")]
    NoContext,

    #[error("context_update requires a context")]
    MissingContext,

    #[error("Unsupported protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u32 },

    #[error("Model failed: {0}")]
    Model(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn invalid(detail: impl std::fmt::Display) -> Self {
        Self::InvalidMessage {
            detail: detail.to_string(),
        }
    }

    /// The wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessage { .. } | Self::MissingContext => codes::INVALID_MESSAGE,
            Self::UnknownMessageType(_) | Self::UnexpectedMessageType(_) => {
                codes::UNKNOWN_MESSAGE_TYPE
            }
            Self::NoContext => codes::NO_CONTEXT,
            Self::UnsupportedVersion { .. } => codes::UNSUPPORTED_VERSION,
            Self::Model(_) => codes::MODEL_ERROR,
            Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Build the payload of the `error` message reporting this failure.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::InvalidMessage { detail } => ErrorPayload {
                code: self.code().into(),
                message: "Failed to process message".into(),
                details: Some(serde_json::Value::String(detail.clone())),
            },
            _ => ErrorPayload {
                code: self.code().into(),
                message: self.to_string(),
                details: None,
            },
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(err)
    }
}

impl From<StoreError> for ProtocolError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ModelError> for ProtocolError {
    fn from(err: ModelError) -> Self {
        Self::Model(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),
}
