//! Mock status channel for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::status::{StatusConnector, StatusError, StatusStream};

enum Frame {
    Text(String),
    Error(String),
    Close,
}

/// Test-side handle to one mock connection.
///
/// Frames pushed here arrive on the stream handed to the session under
/// test; outbound messages the session sends are recorded for assertions.
pub struct MockConnection {
    pub url: String,
    sent: RwLock<Vec<String>>,
    frames: mpsc::UnboundedSender<Frame>,
}

impl MockConnection {
    /// Deliver one inbound text frame.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.frames.send(Frame::Text(text.into()));
    }

    /// Deliver a channel-level error.
    pub fn push_error(&self, reason: impl Into<String>) {
        let _ = self.frames.send(Frame::Error(reason.into()));
    }

    /// Close the channel from the server side.
    pub fn close(&self) {
        let _ = self.frames.send(Frame::Close);
    }

    /// Messages the session sent on this connection, in order.
    pub async fn sent_messages(&self) -> Vec<String> {
        self.sent.read().await.clone()
    }
}

struct MockStream {
    connection: Arc<MockConnection>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl StatusStream for MockStream {
    async fn send_text(&mut self, text: &str) -> Result<(), StatusError> {
        self.connection.sent.write().await.push(text.to_string());
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, StatusError>> {
        match self.rx.recv().await {
            Some(Frame::Text(text)) => Some(Ok(text)),
            Some(Frame::Error(reason)) => Some(Err(StatusError::Transport(reason))),
            Some(Frame::Close) | None => None,
        }
    }
}

/// Mock implementation of the StatusConnector trait.
///
/// Every connect produces a fresh [`MockConnection`]; tests drive inbound
/// frames through the handles and inspect what each session sent.
pub struct MockStatusConnector {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    fail_next: Mutex<bool>,
}

impl Default for MockStatusConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStatusConnector {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
        }
    }

    /// Make the next connect attempt fail.
    pub async fn set_fail_next_connect(&self) {
        *self.fail_next.lock().await = true;
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Handle to the n-th connection (0-based).
    pub async fn connection(&self, index: usize) -> Option<Arc<MockConnection>> {
        self.connections.lock().await.get(index).cloned()
    }

    /// Handle to the most recent connection.
    pub async fn latest(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().await.last().cloned()
    }
}

#[async_trait]
impl StatusConnector for MockStatusConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn StatusStream>, StatusError> {
        if std::mem::take(&mut *self.fail_next.lock().await) {
            return Err(StatusError::ConnectionFailed(
                "mock connect refused".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(MockConnection {
            url: url.to_string(),
            sent: RwLock::new(Vec::new()),
            frames: tx,
        });
        self.connections.lock().await.push(Arc::clone(&connection));

        Ok(Box::new(MockStream { connection, rx }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_through_the_handle() {
        let connector = MockStatusConnector::new();
        let mut stream = connector.connect("ws://test").await.unwrap();
        let connection = connector.latest().await.unwrap();
        assert_eq!(connection.url, "ws://test");

        stream.send_text("job:v1").await.unwrap();
        assert_eq!(connection.sent_messages().await, vec!["job:v1"]);

        connection.push_text("hello");
        assert_eq!(stream.next_text().await.unwrap().unwrap(), "hello");

        connection.close();
        assert!(stream.next_text().await.is_none());
    }

    #[tokio::test]
    async fn test_fail_next_connect_is_one_shot() {
        let connector = MockStatusConnector::new();
        connector.set_fail_next_connect().await;
        assert!(connector.connect("ws://test").await.is_err());
        assert!(connector.connect("ws://test").await.is_ok());
        assert_eq!(connector.connection_count().await, 1);
    }
}
