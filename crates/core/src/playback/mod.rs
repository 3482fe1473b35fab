//! Playback attachment over the streaming manifest.
//!
//! Engines are tried in registration order; the first one that both
//! supports the manifest and attaches successfully wins. At most one
//! session is attached at a time: starting playback for a new job detaches
//! the previous session first.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::EndpointsConfig;
use crate::journal::{JournalHandle, WorkflowEvent};

/// Errors starting playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No registered engine could play the manifest.
    #[error("No playback engine supports this stream")]
    NotSupported,

    /// The engine accepted the manifest but failed to attach.
    #[error("Playback attach failed: {0}")]
    Attach(String),
}

/// A playback backend (native decoder, external player, ...).
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap pre-check: whether this engine can handle the manifest at all.
    fn supports(&self, manifest_url: &str) -> bool;

    /// Attach to the stream and start playing.
    async fn attach(&self, manifest_url: &str) -> Result<Box<dyn PlaybackSession>, PlaybackError>;
}

/// A live playback session. Dropping it is equivalent to detaching.
#[async_trait]
pub trait PlaybackSession: Send {
    fn engine_name(&self) -> &str;

    async fn detach(&mut self);
}

struct AttachedSession {
    job_id: String,
    session: Box<dyn PlaybackSession>,
}

/// Owns the single playback slot and the ordered engine list.
pub struct PlaybackController {
    endpoints: EndpointsConfig,
    engines: Vec<Arc<dyn PlaybackEngine>>,
    journal: JournalHandle,
    attached: Mutex<Option<AttachedSession>>,
}

impl PlaybackController {
    pub fn new(
        endpoints: EndpointsConfig,
        engines: Vec<Arc<dyn PlaybackEngine>>,
        journal: JournalHandle,
    ) -> Self {
        Self {
            endpoints,
            engines,
            journal,
            attached: Mutex::new(None),
        }
    }

    /// Start playback for a ready job, detaching any previous session.
    pub async fn play(&self, job_id: &str) -> Result<(), PlaybackError> {
        let manifest_url = self.endpoints.manifest_url(job_id);

        self.detach_current().await;

        for engine in &self.engines {
            if !engine.supports(&manifest_url) {
                continue;
            }
            match engine.attach(&manifest_url).await {
                Ok(session) => {
                    info!(job_id, engine = engine.name(), "playback attached");
                    self.journal
                        .emit(WorkflowEvent::PlaybackAttached {
                            job_id: job_id.to_string(),
                            engine: engine.name().to_string(),
                            manifest_url: manifest_url.clone(),
                        })
                        .await;
                    *self.attached.lock().await = Some(AttachedSession {
                        job_id: job_id.to_string(),
                        session,
                    });
                    return Ok(());
                }
                Err(e) => {
                    // Fall through to the next engine in order.
                    warn!(engine = engine.name(), "engine attach failed: {}", e);
                }
            }
        }

        self.journal
            .emit(WorkflowEvent::PlaybackUnavailable {
                job_id: job_id.to_string(),
                reason: PlaybackError::NotSupported.to_string(),
            })
            .await;
        Err(PlaybackError::NotSupported)
    }

    /// Detach the current session, if any.
    pub async fn stop(&self) {
        self.detach_current().await;
    }

    /// `(job_id, engine_name)` of the attached session, if any.
    pub async fn current(&self) -> Option<(String, String)> {
        self.attached
            .lock()
            .await
            .as_ref()
            .map(|a| (a.job_id.clone(), a.session.engine_name().to_string()))
    }

    async fn detach_current(&self) {
        if let Some(mut attached) = self.attached.lock().await.take() {
            let engine = attached.session.engine_name().to_string();
            attached.session.detach().await;
            self.journal
                .emit(WorkflowEvent::PlaybackDetached { engine })
                .await;
        }
    }
}
