//! In-memory chronological journal storage.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::handle::{JournalEntry, JournalHandle};

/// Shared read access to the chronological log.
///
/// A fresh user-initiated attempt clears the log; a retry of the same job
/// preserves it.
#[derive(Clone)]
pub struct JournalLog {
    entries: Arc<RwLock<Vec<JournalEntry>>>,
}

impl JournalLog {
    /// Snapshot of all recorded entries, oldest first.
    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all prior history (fresh attempt, not a retry).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Task draining the event channel into the shared log.
pub struct JournalRecorder {
    rx: mpsc::Receiver<JournalEntry>,
    entries: Arc<RwLock<Vec<JournalEntry>>>,
}

impl JournalRecorder {
    /// Run until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(entry) = self.rx.recv().await {
            self.entries.write().await.push(entry);
        }
        debug!("journal recorder stopped");
    }
}

/// Create the journal system: an emitting handle, the recorder task to
/// spawn, and shared read access to the log.
pub fn create_journal(buffer: usize) -> (JournalHandle, JournalRecorder, JournalLog) {
    let (tx, rx) = mpsc::channel(buffer);
    let entries = Arc::new(RwLock::new(Vec::new()));
    let handle = JournalHandle::new(tx);
    let recorder = JournalRecorder {
        rx,
        entries: Arc::clone(&entries),
    };
    let log = JournalLog { entries };
    (handle, recorder, log)
}
