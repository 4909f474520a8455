//! # ctxlink Core
//!
//! Protocol types, traits, and error definitions for the ctxlink model
//! context protocol. This crate has **no transport dependencies**: it defines
//! the wire vocabulary and the seams that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the dispatcher is a trait here. Implementations live
//! in their respective crates. This enables:
//! - Swapping the context store or the model without touching the dispatcher
//! - Testing the dispatcher with a fixed clock and no live transport
//! - Clean dependency graph (all crates depend inward on core)

pub mod clock;
pub mod connection;
pub mod context;
pub mod error;
pub mod message;
pub mod model;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, SystemClock};
pub use connection::ConnectionId;
pub use context::{Context, HistoryEntry, Role};
pub use error::{ModelError, ProtocolError, StoreError};
pub use message::{
    ErrorPayload, Message, MessageType, Payload, PROTOCOL_VERSION, QueryOptions, QueryPayload,
    ResponseMetadata, ResponsePayload, StatusPayload,
};
pub use model::{Generation, Model};
pub use store::ContextStore;
