//! Context store implementations for ctxlink.

pub mod in_memory;

pub use in_memory::InMemoryContextStore;
