//! Handle for emitting workflow events.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::WorkflowEvent;

/// A timestamped journal entry.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub event: WorkflowEvent,
}

/// Handle for emitting workflow events.
///
/// Cheaply cloneable and shared across tasks. Events are sent through an
/// async channel to the recorder; emission never fails the caller.
#[derive(Clone)]
pub struct JournalHandle {
    tx: mpsc::Sender<JournalEntry>,
}

impl JournalHandle {
    /// Create a handle from a channel sender.
    pub fn new(tx: mpsc::Sender<JournalEntry>) -> Self {
        Self { tx }
    }

    /// Emit an event asynchronously. A full or closed channel is logged,
    /// never propagated.
    pub async fn emit(&self, event: WorkflowEvent) {
        let entry = JournalEntry {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(entry).await {
            tracing::error!("Failed to emit workflow event: {}", e);
        }
    }

    /// Try to emit without blocking. Returns whether the event was sent.
    pub fn try_emit(&self, event: WorkflowEvent) -> bool {
        let entry = JournalEntry {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit workflow event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = JournalHandle::new(tx);

        handle
            .emit(WorkflowEvent::ChannelClosed { token: 1 })
            .await;

        let entry = rx.recv().await.expect("Should receive event");
        assert!(matches!(
            entry.event,
            WorkflowEvent::ChannelClosed { token: 1 }
        ));
    }

    #[tokio::test]
    async fn test_try_emit_on_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = JournalHandle::new(tx);
        assert!(!handle.try_emit(WorkflowEvent::ChannelClosed { token: 1 }));
    }
}
