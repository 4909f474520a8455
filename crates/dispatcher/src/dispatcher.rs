//! The dispatcher: one inbound message in, one outbound message out.

use std::sync::Arc;
use std::time::Instant;

use ctxlink_core::clock::{Clock, SystemClock};
use ctxlink_core::connection::ConnectionId;
use ctxlink_core::context::{Context, DEFAULT_MODEL_ID, HistoryEntry};
use ctxlink_core::error::ProtocolError;
use ctxlink_core::message::{Message, Payload, QueryPayload, ResponseMetadata, ResponsePayload};
use ctxlink_core::model::Model;
use ctxlink_core::store::ContextStore;
use tracing::{debug, info, warn};

/// Routes protocol messages to handlers and owns the per-connection contexts.
pub struct Dispatcher {
    /// Connection → context table
    store: Arc<dyn ContextStore>,

    /// Produces reply text for queries
    model: Arc<dyn Model>,

    /// Timestamps history entries
    clock: Arc<dyn Clock>,

    /// Model id used when `init` carries no context
    default_model_id: String,
}

impl Dispatcher {
    /// Create a dispatcher over the given store and model.
    pub fn new(store: Arc<dyn ContextStore>, model: Arc<dyn Model>) -> Self {
        Self {
            store,
            model,
            clock: Arc::new(SystemClock::new()),
            default_model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }

    /// Replace the clock used for history timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the model id of the context created by a bare `init`.
    pub fn with_default_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.default_model_id = model_id.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Parse a raw frame and dispatch it.
    ///
    /// Frames that do not parse are answered with an `error` message; the
    /// caller keeps the connection open.
    pub async fn handle_frame(&self, connection: &ConnectionId, frame: &str) -> Message {
        match Message::parse(frame) {
            Ok(message) => self.handle(connection, message).await,
            Err(err) => {
                warn!(connection = %connection, code = err.code(), error = %err, "Rejected inbound frame");
                err.into()
            }
        }
    }

    /// Dispatch a parsed message for `connection`.
    pub async fn handle(&self, connection: &ConnectionId, message: Message) -> Message {
        let kind = message.message_type();
        debug!(connection = %connection, message_type = %kind, "Dispatching message");

        let result = match message.payload {
            Payload::Init(_) => self.handle_init(connection, message.context).await,
            Payload::Query(query) => self.handle_query(connection, query).await,
            Payload::ContextUpdate(_) => {
                self.handle_context_update(connection, message.context)
                    .await
            }
            Payload::Response(_) | Payload::Error(_) => {
                Err(ProtocolError::UnexpectedMessageType(kind.to_string()))
            }
        };

        result.unwrap_or_else(|err| {
            warn!(
                connection = %connection,
                message_type = %kind,
                code = err.code(),
                error = %err,
                "Message handling failed"
            );
            err.into()
        })
    }

    /// Release the context of a closed connection.
    pub async fn disconnect(&self, connection: &ConnectionId) {
        match self.store.remove(connection).await {
            Ok(Some(context)) => debug!(
                connection = %connection,
                history_len = context.history.len(),
                "Context released"
            ),
            Ok(None) => {}
            Err(e) => warn!(connection = %connection, error = %e, "Failed to release context"),
        }
    }

    async fn handle_init(
        &self,
        connection: &ConnectionId,
        context: Option<Context>,
    ) -> Result<Message, ProtocolError> {
        let context = context.unwrap_or_else(|| Context::new(self.default_model_id.clone()));
        self.store.set(connection, context.clone()).await?;

        info!(connection = %connection, model = %context.model_id, "Context initialized");
        Ok(Message::initialized(context))
    }

    async fn handle_query(
        &self,
        connection: &ConnectionId,
        query: QueryPayload,
    ) -> Result<Message, ProtocolError> {
        let mut context = self
            .store
            .get(connection)
            .await?
            .ok_or(ProtocolError::NoContext)?;

        let started = Instant::now();
        let generation = self.model.generate(&context, &query).await?;
        let processing_time = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let user_at = self.clock.now_millis();
        let assistant_at = self.clock.now_millis().max(user_at);
        context.record_exchange(
            HistoryEntry::user(query.prompt, user_at),
            HistoryEntry::assistant(generation.text.clone(), assistant_at),
        );
        self.store.set(connection, context.clone()).await?;

        debug!(
            connection = %connection,
            tokens = generation.tokens,
            history_len = context.history.len(),
            "Query answered"
        );

        let payload = ResponsePayload {
            text: generation.text,
            metadata: Some(ResponseMetadata {
                tokens: generation.tokens,
                processing_time,
                model: context.model_id.clone(),
            }),
        };
        Ok(Message::response(payload, context))
    }

    async fn handle_context_update(
        &self,
        connection: &ConnectionId,
        context: Option<Context>,
    ) -> Result<Message, ProtocolError> {
        if self.store.get(connection).await?.is_none() {
            return Err(ProtocolError::NoContext);
        }

        let context = context.ok_or(ProtocolError::MissingContext)?;
        self.store.set(connection, context.clone()).await?;

        info!(connection = %connection, model = %context.model_id, "Context replaced");
        Ok(Message::updated(context))
    }
}
