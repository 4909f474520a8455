//! Protocol client over `tokio-tungstenite`.
//!
//! Strictly request/response: send one message, read the one reply, repeat.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use ctxlink_core::error::ProtocolError;
use ctxlink_core::message::Message;

/// Errors from the protocol client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] Box<tungstenite::Error>),

    #[error("Invalid frame from server: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection closed by server")]
    Closed,
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// A connected protocol client.
pub struct Client {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Connect to a server, e.g. `ws://localhost:3000`.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (socket, _response) = connect_async(url).await?;
        debug!(url = %url, "Connected");
        Ok(Self { socket })
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        self.send_raw(&message.to_json()?).await
    }

    /// Send an arbitrary text frame, bypassing the schema.
    pub async fn send_raw(&mut self, frame: &str) -> Result<(), ClientError> {
        self.socket.send(WsMessage::Text(frame.to_owned().into())).await?;
        Ok(())
    }

    /// Send a binary frame; the server decodes it as UTF-8 JSON.
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), ClientError> {
        self.socket.send(WsMessage::Binary(bytes.into())).await?;
        Ok(())
    }

    /// Wait for the next protocol message, skipping control frames.
    pub async fn recv(&mut self) -> Result<Message, ClientError> {
        while let Some(frame) = self.socket.next().await {
            match frame? {
                WsMessage::Text(text) => return Ok(Message::parse(text.as_str())?),
                WsMessage::Binary(bytes) => {
                    let text = std::str::from_utf8(&bytes).map_err(ProtocolError::invalid)?;
                    return Ok(Message::parse(text)?);
                }
                WsMessage::Close(_) => return Err(ClientError::Closed),
                _ => continue,
            }
        }
        Err(ClientError::Closed)
    }

    /// Send `message` and return the server's reply.
    pub async fn request(&mut self, message: &Message) -> Result<Message, ClientError> {
        self.send(message).await?;
        self.recv().await
    }

    /// Close the connection politely.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
