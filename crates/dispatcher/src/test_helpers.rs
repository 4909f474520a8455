//! Shared test helpers for dispatcher tests.

use async_trait::async_trait;
use ctxlink_core::clock::Clock;
use ctxlink_core::connection::ConnectionId;
use ctxlink_core::context::Context;
use ctxlink_core::error::{ModelError, StoreError};
use ctxlink_core::message::QueryPayload;
use ctxlink_core::model::{Generation, Model};
use ctxlink_core::store::ContextStore;
use std::sync::atomic::{AtomicI64, Ordering};

/// A clock that advances by `step` milliseconds on every read.
pub struct SteppingClock {
    now: AtomicI64,
    step: i64,
}

impl SteppingClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// A model that always fails.
pub struct FailingModel;

#[async_trait]
impl Model for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _context: &Context,
        _query: &QueryPayload,
    ) -> Result<Generation, ModelError> {
        Err(ModelError::GenerationFailed("backend offline".into()))
    }
}

/// A store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl ContextStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _id: &ConnectionId) -> Result<Option<Context>, StoreError> {
        Err(StoreError::Unavailable("broken".into()))
    }

    async fn set(&self, _id: &ConnectionId, _context: Context) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("broken".into()))
    }

    async fn remove(&self, _id: &ConnectionId) -> Result<Option<Context>, StoreError> {
        Err(StoreError::Unavailable("broken".into()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("broken".into()))
    }
}
