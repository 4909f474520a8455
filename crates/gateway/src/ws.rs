//! WebSocket connection listener.
//!
//! Protocol:
//! - Client → Server: one JSON `Message` per frame (text, or UTF-8 binary)
//! - Server → Client: exactly one JSON `Message` per inbound frame, in order
//!
//! The connection's context is released when the socket closes, whichever
//! side closed it.

use axum::{
    extract::State,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use ctxlink_core::connection::ConnectionId;
use ctxlink_core::error::{ProtocolError, codes};
use ctxlink_core::message::{Message, PROTOCOL_VERSION};
use tracing::{debug, error, info, warn};

use crate::SharedState;

/// `GET /` — upgrade to a protocol WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(mut socket: WebSocket, state: SharedState) {
    let connection = ConnectionId::new();
    info!(connection = %connection, "Client connected");

    while let Some(frame) = socket.recv().await {
        let reply = match frame {
            Ok(WsMessage::Text(text)) => {
                state
                    .dispatcher
                    .handle_frame(&connection, text.as_str())
                    .await
            }
            Ok(WsMessage::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => state.dispatcher.handle_frame(&connection, text).await,
                Err(e) => ProtocolError::invalid(format!("frame is not valid UTF-8: {e}")).into(),
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue, // ping / pong
            Err(e) => {
                warn!(connection = %connection, error = %e, "WebSocket error");
                break;
            }
        };

        debug!(connection = %connection, message_type = %reply.message_type(), "Sending reply");
        if let Err(e) = socket.send(WsMessage::Text(encode(&reply).into())).await {
            warn!(connection = %connection, error = %e, "Failed to send reply");
            break;
        }
    }

    state.dispatcher.disconnect(&connection).await;
    info!(connection = %connection, "Client disconnected");
}

/// Serialize an outbound message, degrading to an `INTERNAL_ERROR` frame.
fn encode(message: &Message) -> String {
    message.to_json().unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize outbound message");
        serde_json::json!({
            "type": "error",
            "payload": {
                "code": codes::INTERNAL_ERROR,
                "message": format!("Failed to serialize response: {e}"),
            },
            "version": PROTOCOL_VERSION,
        })
        .to_string()
    })
}
