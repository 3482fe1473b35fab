//! Mock playback engine for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::playback::{PlaybackEngine, PlaybackError, PlaybackSession};

struct MockSession {
    name: String,
    detach_count: Arc<AtomicU32>,
}

#[async_trait]
impl PlaybackSession for MockSession {
    fn engine_name(&self) -> &str {
        &self.name
    }

    async fn detach(&mut self) {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the PlaybackEngine trait.
pub struct MockPlaybackEngine {
    name: String,
    supports: bool,
    attach_ok: Arc<RwLock<bool>>,
    attached_manifests: Arc<RwLock<Vec<String>>>,
    detach_count: Arc<AtomicU32>,
}

impl MockPlaybackEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports: true,
            attach_ok: Arc::new(RwLock::new(true)),
            attached_manifests: Arc::new(RwLock::new(Vec::new())),
            detach_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// An engine whose pre-check rejects every manifest.
    pub fn unsupporting(name: impl Into<String>) -> Self {
        Self {
            supports: false,
            ..Self::new(name)
        }
    }

    /// Make attach attempts fail.
    pub async fn set_attach_fails(&self, fails: bool) {
        *self.attach_ok.write().await = !fails;
    }

    /// Manifest URLs this engine attached to, in order.
    pub async fn attached_manifests(&self) -> Vec<String> {
        self.attached_manifests.read().await.clone()
    }

    pub fn detach_count(&self) -> u32 {
        self.detach_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackEngine for MockPlaybackEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, _manifest_url: &str) -> bool {
        self.supports
    }

    async fn attach(&self, manifest_url: &str) -> Result<Box<dyn PlaybackSession>, PlaybackError> {
        if !*self.attach_ok.read().await {
            return Err(PlaybackError::Attach("mock attach refused".to_string()));
        }
        self.attached_manifests
            .write()
            .await
            .push(manifest_url.to_string());
        Ok(Box::new(MockSession {
            name: self.name.clone(),
            detach_count: Arc::clone(&self.detach_count),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_attachments_and_detaches() {
        let engine = MockPlaybackEngine::new("mock");
        let mut session = engine.attach("http://h/stream/v1/manifest").await.unwrap();
        assert_eq!(
            engine.attached_manifests().await,
            vec!["http://h/stream/v1/manifest"]
        );

        session.detach().await;
        assert_eq!(engine.detach_count(), 1);
    }
}
