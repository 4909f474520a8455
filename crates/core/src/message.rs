//! Message schema — the wire vocabulary shared by client and server.
//!
//! Every frame is one JSON object:
//!
//! ```json
//! { "type": "query", "payload": { "prompt": "Hi" }, "context": null, "version": 1 }
//! ```
//!
//! The `payload` shape depends on `type`. On the Rust side it is the sum type
//! [`Payload`], narrowed once in [`Message::parse`] so handlers never inspect
//! raw JSON.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::context::Context;
use crate::error::ProtocolError;

/// Protocol version stamped on outbound messages.
pub const PROTOCOL_VERSION: u32 = 1;

/// The closed set of message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Init,
    Query,
    Response,
    Error,
    ContextUpdate,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::Init,
        MessageType::Query,
        MessageType::Response,
        MessageType::Error,
        MessageType::ContextUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Query => "query",
            Self::Response => "response",
            Self::Error => "error",
            Self::ContextUpdate => "context_update",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownMessageType(s.to_string()))
    }
}

/// Advisory generation options attached to a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Tokens in the generated text.
    pub tokens: u32,
    /// Milliseconds spent producing the text.
    pub processing_time: u64,
    /// Model identifier taken from the connection's context.
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Status object used by `init` and `context_update`.
///
/// Requests send it empty (`{}`); acknowledgements fill in `status` and
/// the stored context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Payload narrowed by the message type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Init(StatusPayload),
    Query(QueryPayload),
    Response(ResponsePayload),
    Error(ErrorPayload),
    ContextUpdate(StatusPayload),
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Init(_) => MessageType::Init,
            Self::Query(_) => MessageType::Query,
            Self::Response(_) => MessageType::Response,
            Self::Error(_) => MessageType::Error,
            Self::ContextUpdate(_) => MessageType::ContextUpdate,
        }
    }
}

/// One unit of protocol exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub payload: Payload,
    /// Optional context snapshot attached to the message.
    pub context: Option<Context>,
}

/// Raw frame shape, before the payload is narrowed.
#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    context: Option<Context>,
    #[serde(default)]
    version: Option<u64>,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    #[serde(rename = "type")]
    kind: MessageType,
    payload: &'a Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a Context>,
    version: u32,
}

impl Message {
    pub fn new(payload: Payload, context: Option<Context>) -> Self {
        Self { payload, context }
    }

    /// Client request: start a conversation, optionally seeding the context.
    pub fn init(context: Option<Context>) -> Self {
        Self::new(Payload::Init(StatusPayload::default()), context)
    }

    pub fn query(prompt: impl Into<String>) -> Self {
        Self::new(
            Payload::Query(QueryPayload {
                prompt: prompt.into(),
                options: None,
            }),
            None,
        )
    }

    pub fn query_with_options(prompt: impl Into<String>, options: QueryOptions) -> Self {
        Self::new(
            Payload::Query(QueryPayload {
                prompt: prompt.into(),
                options: Some(options),
            }),
            None,
        )
    }

    /// Client request: replace the connection's context.
    pub fn context_update(context: Context) -> Self {
        Self::new(Payload::ContextUpdate(StatusPayload::default()), Some(context))
    }

    /// Server acknowledgement of `init`.
    pub fn initialized(context: Context) -> Self {
        Self::new(
            Payload::Init(StatusPayload {
                status: Some("initialized".into()),
                context: Some(context.clone()),
            }),
            Some(context),
        )
    }

    /// Server acknowledgement of `context_update`.
    pub fn updated(context: Context) -> Self {
        Self::new(
            Payload::ContextUpdate(StatusPayload {
                status: Some("updated".into()),
                context: Some(context.clone()),
            }),
            Some(context),
        )
    }

    pub fn response(payload: ResponsePayload, context: Context) -> Self {
        Self::new(Payload::Response(payload), Some(context))
    }

    pub fn error(payload: ErrorPayload) -> Self {
        Self::new(Payload::Error(payload), None)
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn as_error(&self) -> Option<&ErrorPayload> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&ResponsePayload> {
        match &self.payload {
            Payload::Response(r) => Some(r),
            _ => None,
        }
    }

    /// The `status` of an `init` / `context_update` acknowledgement.
    pub fn status(&self) -> Option<&str> {
        match &self.payload {
            Payload::Init(s) | Payload::ContextUpdate(s) => s.status.as_deref(),
            _ => None,
        }
    }

    /// Parse one frame, classifying failures into the protocol taxonomy.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawMessage = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawMessage) -> Result<Self, ProtocolError> {
        if let Some(found) = raw.version {
            if found != u64::from(PROTOCOL_VERSION) {
                return Err(ProtocolError::UnsupportedVersion {
                    found,
                    expected: PROTOCOL_VERSION,
                });
            }
        }

        let kind: MessageType = raw.kind.parse()?;
        let payload = match kind {
            MessageType::Init => Payload::Init(status_payload(raw.payload)?),
            MessageType::ContextUpdate => Payload::ContextUpdate(status_payload(raw.payload)?),
            MessageType::Query => Payload::Query(serde_json::from_value(raw.payload)?),
            MessageType::Response => Payload::Response(serde_json::from_value(raw.payload)?),
            MessageType::Error => Payload::Error(serde_json::from_value(raw.payload)?),
        };

        Ok(Self {
            payload,
            context: raw.context,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `init` and `context_update` requests may omit the payload entirely.
fn status_payload(value: serde_json::Value) -> Result<StatusPayload, serde_json::Error> {
    if value.is_null() {
        Ok(StatusPayload::default())
    } else {
        serde_json::from_value(value)
    }
}

impl From<ProtocolError> for Message {
    fn from(err: ProtocolError) -> Self {
        Self::error(err.to_payload())
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutboundMessage {
            kind: self.message_type(),
            payload: &self.payload,
            context: self.context.as_ref(),
            version: PROTOCOL_VERSION,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawMessage::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(D::Error::custom)
    }
}
