//! Message dispatcher for the ctxlink protocol.
//!
//! Routes each inbound message to a handler by its type, drives the context
//! store for the sending connection, and returns exactly one outbound
//! message (a response, an acknowledgement, or an error).

pub mod dispatcher;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::Dispatcher;
