//! Ready-list view: the set of fully processed jobs and the current
//! selection.
//!
//! The set is rebuilt wholesale on each fetch; there is no incremental
//! diffing. Fetch failures are reported through the journal and never
//! touch upload or processing state.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::journal::{JournalHandle, WorkflowEvent};

pub use http::HttpReadyClient;

/// Errors fetching the ready list.
#[derive(Debug, Error)]
pub enum ReadyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status: HTTP {0}")]
    UnexpectedStatus(u16),
}

/// Client for the readiness/listing service.
#[async_trait]
pub trait ReadyClient: Send + Sync {
    /// Fetch the identifiers of all fully processed jobs.
    async fn fetch_ready(&self) -> Result<Vec<String>, ReadyError>;
}

/// Selection rule applied after each rebuild: keep the current selection if
/// still present, else prefer the just-completed job, else the first
/// element, else nothing.
fn select(current: Option<&str>, jobs: &[String], just_completed: Option<&str>) -> Option<String> {
    if let Some(current) = current {
        if jobs.iter().any(|j| j == current) {
            return Some(current.to_string());
        }
    }
    if let Some(completed) = just_completed {
        if jobs.iter().any(|j| j == completed) {
            return Some(completed.to_string());
        }
    }
    jobs.first().cloned()
}

#[derive(Debug, Default)]
struct ReadyState {
    jobs: Vec<String>,
    selected: Option<String>,
}

/// The ready set plus the user's current selection.
pub struct ReadyListView {
    client: Arc<dyn ReadyClient>,
    journal: JournalHandle,
    state: RwLock<ReadyState>,
}

impl ReadyListView {
    pub fn new(client: Arc<dyn ReadyClient>, journal: JournalHandle) -> Self {
        Self {
            client,
            journal,
            state: RwLock::new(ReadyState::default()),
        }
    }

    /// Refetch the ready set and reapply the selection rule.
    /// `just_completed` is the job that triggered this refresh, if any.
    pub async fn refresh(&self, just_completed: Option<&str>) {
        match self.client.fetch_ready().await {
            Ok(jobs) => {
                let selected = {
                    let mut state = self.state.write().await;
                    state.selected = select(state.selected.as_deref(), &jobs, just_completed);
                    state.jobs = jobs.clone();
                    state.selected.clone()
                };
                self.journal
                    .emit(WorkflowEvent::ReadyListRefreshed { jobs, selected })
                    .await;
            }
            Err(e) => {
                warn!("ready list fetch failed: {}", e);
                self.journal
                    .emit(WorkflowEvent::ReadyListFetchFailed {
                        reason: e.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Current ready set, as of the last successful fetch.
    pub async fn jobs(&self) -> Vec<String> {
        self.state.read().await.jobs.clone()
    }

    /// Current selection, if any.
    pub async fn selected(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }

    /// User-driven selection; only identifiers present in the set stick.
    pub async fn select_job(&self, job_id: &str) -> bool {
        let mut state = self.state.write().await;
        if state.jobs.iter().any(|j| j == job_id) {
            state.selected = Some(job_id.to_string());
            true
        } else {
            false
        }
    }
}
