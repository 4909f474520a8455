//! In-memory context store — contexts live exactly as long as the process.

use async_trait::async_trait;
use ctxlink_core::connection::ConnectionId;
use ctxlink_core::context::Context;
use ctxlink_core::error::StoreError;
use ctxlink_core::store::ContextStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A context store backed by a `HashMap` behind an async `RwLock`.
///
/// Connections never share entries, so the lock only guards the map
/// structure itself; it is held for a single insert, lookup or removal.
#[derive(Clone)]
pub struct InMemoryContextStore {
    contexts: Arc<RwLock<HashMap<ConnectionId, Context>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ConnectionId) -> Result<Option<Context>, StoreError> {
        Ok(self.contexts.read().await.get(id).cloned())
    }

    async fn set(&self, id: &ConnectionId, context: Context) -> Result<(), StoreError> {
        self.contexts.write().await.insert(id.clone(), context);
        Ok(())
    }

    async fn remove(&self, id: &ConnectionId) -> Result<Option<Context>, StoreError> {
        Ok(self.contexts.write().await.remove(id))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.contexts.read().await.len())
    }
}
