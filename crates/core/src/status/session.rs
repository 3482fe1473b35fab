//! One logical status-channel subscription per upload attempt.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::message::StatusMessage;
use super::types::{SessionToken, StatusError};

/// Connects to a status channel endpoint.
///
/// Implemented by the real WebSocket transport and by the in-memory mock
/// used in tests.
#[async_trait]
pub trait StatusConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn StatusStream>, StatusError>;
}

/// An open status channel connection.
#[async_trait]
pub trait StatusStream: Send {
    /// Send one outbound text frame.
    async fn send_text(&mut self, text: &str) -> Result<(), StatusError>;

    /// Receive the next inbound text frame. `None` means the channel closed.
    async fn next_text(&mut self) -> Option<Result<String, StatusError>>;
}

/// An inbound occurrence on a session, tagged with that session's token.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub token: SessionToken,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone)]
pub enum SessionEventKind {
    /// One inbound frame, raw plus its classification.
    Message {
        raw: String,
        message: StatusMessage,
    },
    /// The channel closed.
    Closed,
    /// A channel-level error.
    Error(String),
}

/// A live status-channel session.
///
/// Owns the reader task for one connection. Dropping or closing the session
/// tears the connection down; any of its events still in flight carry the
/// session token and are discarded by the orchestrator's staleness check.
pub struct StatusSession {
    token: SessionToken,
    reader: JoinHandle<()>,
}

impl StatusSession {
    /// Connect, announce interest in `job_id`, and start forwarding inbound
    /// events tagged with `token` into `events`.
    pub async fn open(
        connector: &dyn StatusConnector,
        url: &str,
        job_id: &str,
        token: SessionToken,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<StatusSession, StatusError> {
        let mut stream = connector.connect(url).await?;
        stream.send_text(&format!("job:{job_id}")).await?;
        debug!(url, job_id, token, "status channel connected");

        let reader = tokio::spawn(async move {
            loop {
                match stream.next_text().await {
                    Some(Ok(raw)) => {
                        let message = StatusMessage::classify(&raw);
                        let event = SessionEvent {
                            token,
                            kind: SessionEventKind::Message { raw, message },
                        };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let event = SessionEvent {
                            token,
                            kind: SessionEventKind::Error(e.to_string()),
                        };
                        let _ = events.send(event).await;
                        return;
                    }
                    None => {
                        let event = SessionEvent {
                            token,
                            kind: SessionEventKind::Closed,
                        };
                        let _ = events.send(event).await;
                        return;
                    }
                }
            }
        });

        Ok(StatusSession { token, reader })
    }

    /// The token this session's events are tagged with.
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Tear down the connection. Events already queued from this session
    /// remain in the channel and are dropped by the token check.
    pub fn close(&self) {
        debug!(token = self.token, "closing status session");
        self.reader.abort();
    }
}

impl Drop for StatusSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Minimal scripted stream: yields the given frames, then closes.
    struct ScriptedStream {
        sent: Arc<Mutex<Vec<String>>>,
        frames: Vec<String>,
    }

    #[async_trait]
    impl StatusStream for ScriptedStream {
        async fn send_text(&mut self, text: &str) -> Result<(), StatusError> {
            self.sent.lock().await.push(text.to_string());
            Ok(())
        }

        async fn next_text(&mut self) -> Option<Result<String, StatusError>> {
            if self.frames.is_empty() {
                None
            } else {
                Some(Ok(self.frames.remove(0)))
            }
        }
    }

    struct ScriptedConnector {
        sent: Arc<Mutex<Vec<String>>>,
        frames: Vec<String>,
    }

    #[async_trait]
    impl StatusConnector for ScriptedConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn StatusStream>, StatusError> {
            Ok(Box::new(ScriptedStream {
                sent: Arc::clone(&self.sent),
                frames: self.frames.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn test_session_announces_job_and_forwards_tagged_events() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector {
            sent: Arc::clone(&sent),
            frames: vec![r#"{"type":"meta","totalSegments":2}"#.to_string()],
        };
        let (tx, mut rx) = mpsc::channel(8);

        let session = StatusSession::open(&connector, "ws://test", "v1", 7, tx)
            .await
            .unwrap();
        assert_eq!(session.token(), 7);
        assert_eq!(sent.lock().await.as_slice(), &["job:v1".to_string()]);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.token, 7);
        assert!(matches!(
            event.kind,
            SessionEventKind::Message {
                message: StatusMessage::Meta { total_segments: 2 },
                ..
            }
        ));

        // Stream exhausted: the session reports closure.
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.kind, SessionEventKind::Closed));
    }
}
