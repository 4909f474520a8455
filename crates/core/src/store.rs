//! Context store trait — connection identity → conversational context.
//!
//! Each entry is owned by exactly one connection. The dispatcher is the only
//! writer, and it never touches two connections' entries in one operation.

use async_trait::async_trait;

use crate::connection::ConnectionId;
use crate::context::Context;
use crate::error::StoreError;

/// Core ContextStore trait.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Human-readable name (e.g. "in_memory").
    fn name(&self) -> &str;

    async fn get(&self, id: &ConnectionId) -> Result<Option<Context>, StoreError>;

    /// Insert or replace the context for `id`.
    async fn set(&self, id: &ConnectionId, context: Context) -> Result<(), StoreError>;

    /// Remove and return the context for `id`, if any.
    async fn remove(&self, id: &ConnectionId) -> Result<Option<Context>, StoreError>;

    /// Number of live contexts.
    async fn count(&self) -> Result<usize, StoreError>;
}
