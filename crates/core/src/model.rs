//! Model trait — the abstraction over whatever turns a prompt into text.
//!
//! The protocol only fixes the interface: prompt in, text plus token count
//! out. Implementations range from a fixed template to a real LLM backend.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ModelError;
use crate::message::QueryPayload;

/// The output of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub tokens: u32,
}

impl Generation {
    /// Build a generation, counting whitespace-separated tokens.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
        Self { text, tokens }
    }
}

/// Core Model trait.
#[async_trait]
pub trait Model: Send + Sync {
    /// Human-readable name (e.g. "template").
    fn name(&self) -> &str;

    /// Produce a reply to `query` given the connection's current context
    /// (before the exchange is recorded).
    async fn generate(&self, context: &Context, query: &QueryPayload)
    -> Result<Generation, ModelError>;
}
