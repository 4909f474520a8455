//! Network edge for ctxlink.
//!
//! Exposes the protocol over WebSocket (`GET /` and `GET /ws`) plus a
//! `GET /health` probe, and ships the matching protocol [`client::Client`].
//!
//! Built on Axum; one task per connection, frames handled strictly in order.

pub mod client;
pub mod ws;

use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ctxlink_config::AppConfig;
use ctxlink_core::store::ContextStore;
use ctxlink_dispatcher::Dispatcher;
use ctxlink_memory::InMemoryContextStore;
use ctxlink_providers::TemplateModel;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            start_time: chrono::Utc::now(),
        }
    }

    /// Wire the in-memory store and the template model from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = Arc::new(InMemoryContextStore::new());
        let model = Arc::new(TemplateModel::from_config(&config.model));
        let dispatcher = Dispatcher::new(store, model)
            .with_default_model_id(config.model.default_model_id.clone());
        Self::new(dispatcher)
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Start the server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.server.addr();
    let state = Arc::new(GatewayState::from_config(&config));

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "ctxlink server listening");

    serve(listener, state, shutdown_signal()).await?;

    info!("ctxlink server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: String,
    active_contexts: usize,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let store = state.dispatcher.store();
    let active_contexts = store.count().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to count contexts");
        0
    });

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: store.name().to_string(),
        active_contexts,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ctxlink_core::connection::ConnectionId;
    use ctxlink_core::message::Message;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        Arc::new(GatewayState::from_config(&AppConfig::default()))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "in_memory");
        assert_eq!(json["activeContexts"], 0);
    }

    #[tokio::test]
    async fn health_counts_live_contexts() {
        let state = test_state();
        state
            .dispatcher
            .handle(&ConnectionId::from("c1"), Message::init(None))
            .await;

        let app = build_router(state);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["activeContexts"], 1);
    }

    #[tokio::test]
    async fn ws_routes_exist() {
        // A plain GET without upgrade headers is rejected by the upgrade
        // extractor, but the routes themselves must be mounted.
        for uri in ["/", "/ws"] {
            let app = build_router(test_state());
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.oneshot(req).await.unwrap();
            assert_ne!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn from_config_wires_model_settings() {
        let mut config = AppConfig::default();
        config.model.default_model_id = "configured".into();
        config.model.response_template = "echo: {prompt}".into();
        let state = GatewayState::from_config(&config);
        let conn = ConnectionId::from("c1");

        let ack = state.dispatcher.handle(&conn, Message::init(None)).await;
        assert_eq!(ack.context.unwrap().model_id, "configured");

        let reply = state.dispatcher.handle(&conn, Message::query("Hi")).await;
        assert_eq!(reply.as_response().unwrap().text, "echo: Hi");
    }
}
