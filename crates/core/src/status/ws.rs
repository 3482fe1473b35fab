//! WebSocket transport for the status channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::session::{StatusConnector, StatusStream};
use super::types::StatusError;

/// Real status-channel connector over `ws://` / `wss://`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StatusConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn StatusStream>, StatusError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| StatusError::ConnectionFailed(e.to_string()))?;
        Ok(Box::new(WsStream { inner: stream }))
    }
}

struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StatusStream for WsStream {
    async fn send_text(&mut self, text: &str) -> Result<(), StatusError> {
        self.inner
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| StatusError::Transport(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, StatusError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                // Opaque binary frames are surfaced as text for the log.
                Ok(Message::Binary(data)) => {
                    return Some(Ok(String::from_utf8_lossy(&data).into_owned()))
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(StatusError::Transport(e.to_string()))),
            }
        }
    }
}
