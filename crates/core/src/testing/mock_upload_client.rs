//! Mock upload client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::upload::{UploadAccepted, UploadClient, UploadError, UploadInfo, UploadPayload};

/// A recorded upload call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub file_name: String,
    pub retry_of: Option<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Scripted response for one upload call.
#[derive(Debug, Clone)]
pub enum ScriptedUpload {
    /// HTTP 202 with a job identifier.
    Accept {
        job_id: String,
        status_url: Option<String>,
    },
    /// HTTP 202 with no identifier in the body.
    AcceptWithoutId,
    /// Non-202 response.
    Status(u16),
    /// Request never completed.
    Transport(String),
}

/// Mock implementation of the UploadClient trait.
///
/// Upload calls consume scripted responses in order; once the script runs
/// out, calls are accepted with generated identifiers. The readiness probe
/// answer is configured separately.
pub struct MockUploadClient {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    script: Arc<RwLock<VecDeque<ScriptedUpload>>>,
    info_total: Arc<RwLock<Option<u32>>>,
    info_fails: Arc<RwLock<bool>>,
    info_calls: Arc<RwLock<u32>>,
}

impl Default for MockUploadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUploadClient {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(RwLock::new(Vec::new())),
            script: Arc::new(RwLock::new(VecDeque::new())),
            info_total: Arc::new(RwLock::new(None)),
            info_fails: Arc::new(RwLock::new(false)),
            info_calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Queue the response for the next unscripted upload call.
    pub async fn push_response(&self, response: ScriptedUpload) {
        self.script.write().await.push_back(response);
    }

    /// Total segment count answered by the readiness probe.
    pub async fn set_info_total(&self, total: Option<u32>) {
        *self.info_total.write().await = total;
    }

    /// Make the readiness probe fail.
    pub async fn set_info_fails(&self, fails: bool) {
        *self.info_fails.write().await = fails;
    }

    /// All recorded upload calls, in order.
    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }

    pub async fn info_call_count(&self) -> u32 {
        *self.info_calls.read().await
    }
}

#[async_trait]
impl UploadClient for MockUploadClient {
    async fn upload(
        &self,
        payload: &UploadPayload,
        retry_of: Option<&str>,
    ) -> Result<UploadAccepted, UploadError> {
        self.uploads.write().await.push(RecordedUpload {
            file_name: payload.file_name.clone(),
            retry_of: retry_of.map(|s| s.to_string()),
            timestamp: Utc::now(),
        });

        let scripted = self.script.write().await.pop_front();
        match scripted {
            Some(ScriptedUpload::Accept { job_id, status_url }) => {
                Ok(UploadAccepted { job_id, status_url })
            }
            Some(ScriptedUpload::AcceptWithoutId) => Err(UploadError::MissingJobId),
            Some(ScriptedUpload::Status(code)) => Err(UploadError::UnexpectedStatus(code)),
            Some(ScriptedUpload::Transport(reason)) => Err(UploadError::Transport(reason)),
            None => {
                let count = self.uploads.read().await.len();
                Ok(UploadAccepted {
                    job_id: format!("mock-job-{count}"),
                    status_url: None,
                })
            }
        }
    }

    async fn fetch_upload_info(
        &self,
        _job_id: &str,
        _status_url: Option<&str>,
    ) -> Result<UploadInfo, UploadError> {
        *self.info_calls.write().await += 1;
        if *self.info_fails.read().await {
            return Err(UploadError::Transport("probe unavailable".to_string()));
        }
        Ok(UploadInfo {
            total_segments: *self.info_total.read().await,
        })
    }
}
