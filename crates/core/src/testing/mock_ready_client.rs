//! Mock ready-list client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ready::{ReadyClient, ReadyError};

/// Mock implementation of the ReadyClient trait.
pub struct MockReadyClient {
    jobs: Arc<RwLock<Vec<String>>>,
    fails: Arc<RwLock<bool>>,
    fetch_count: Arc<RwLock<u32>>,
}

impl Default for MockReadyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReadyClient {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            fails: Arc::new(RwLock::new(false)),
            fetch_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Replace the ready set served to the next fetches.
    pub async fn set_jobs(&self, jobs: Vec<String>) {
        *self.jobs.write().await = jobs;
    }

    /// Make fetches fail.
    pub async fn set_fails(&self, fails: bool) {
        *self.fails.write().await = fails;
    }

    pub async fn fetch_count(&self) -> u32 {
        *self.fetch_count.read().await
    }
}

#[async_trait]
impl ReadyClient for MockReadyClient {
    async fn fetch_ready(&self) -> Result<Vec<String>, ReadyError> {
        *self.fetch_count.write().await += 1;
        if *self.fails.read().await {
            return Err(ReadyError::Transport("mock fetch refused".to_string()));
        }
        Ok(self.jobs.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_configured_jobs() {
        let client = MockReadyClient::new();
        client.set_jobs(vec!["v1".to_string()]).await;
        assert_eq!(client.fetch_ready().await.unwrap(), vec!["v1"]);
        assert_eq!(client.fetch_count().await, 1);
    }
}
