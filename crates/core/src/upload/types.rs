//! Types for the upload workflow.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::ProgressTracker;
use crate::status::StatusError;

/// Errors that can occur while driving an upload attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never completed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upload endpoint answered with something other than 202.
    #[error("Unexpected upload status: HTTP {0}")]
    UnexpectedStatus(u16),

    /// 202 accepted but no job identifier in the body. Terminal, and
    /// distinct from a transport failure.
    #[error("Upload response missing job identifier")]
    MissingJobId,

    /// Status channel failure.
    #[error("Status channel error: {0}")]
    Channel(#[from] StatusError),
}

/// Lifecycle state of the current job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Uploading,
    AwaitingSubscription,
    Streaming,
    RetryPending,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Uploading => "uploading",
            JobState::AwaitingSubscription => "awaiting_subscription",
            JobState::Streaming => "streaming",
            JobState::RetryPending => "retry_pending",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Terminal for the attempt: only a fresh start leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Single-writer state block owned by the orchestrator.
///
/// Other components read cloned snapshots or emit events into the
/// orchestrator; none mutate this directly.
#[derive(Debug, Clone, Default)]
pub struct JobSlot {
    /// Server-assigned identifier; reused across retries of the same job.
    pub job_id: Option<String>,
    pub state: JobState,
    pub progress: ProgressTracker,
    /// An upload attempt is running (upload through streaming, until a
    /// terminal state or `RetryPending`).
    pub in_flight: bool,
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Idle
    }
}

/// The binary payload of one upload. Cheap to clone: retries re-send the
/// same bytes.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl UploadPayload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// Successful (202) upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAccepted {
    pub job_id: String,
    /// Status channel address, when the backend supplies one.
    pub status_url: Option<String>,
}

/// Readiness probe response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInfo {
    pub total_segments: Option<u32>,
}

/// The persistent user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Idle,
    Uploading,
    /// Segment-processing progress, determinate or "N events".
    Processing { display: String },
    Retrying { remaining: u32 },
    Completed,
    Failed { reason: String },
}

impl Default for StatusLine {
    fn default() -> Self {
        StatusLine::Idle
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Idle => write!(f, "idle"),
            StatusLine::Uploading => write!(f, "uploading"),
            StatusLine::Processing { display } => write!(f, "processing {display}"),
            StatusLine::Retrying { remaining } => write!(f, "retrying in {remaining}s"),
            StatusLine::Completed => write!(f, "upload complete"),
            StatusLine::Failed { reason } => write!(f, "upload failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(JobState::Idle.as_str(), "idle");
        assert_eq!(JobState::RetryPending.as_str(), "retry_pending");
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Streaming.is_terminal());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            UploadError::UnexpectedStatus(500).to_string(),
            "Unexpected upload status: HTTP 500"
        );
        assert_eq!(
            UploadError::MissingJobId.to_string(),
            "Upload response missing job identifier"
        );
    }

    #[test]
    fn test_status_line_display() {
        assert_eq!(StatusLine::Idle.to_string(), "idle");
        assert_eq!(
            StatusLine::Processing {
                display: "75% (3/4)".to_string()
            }
            .to_string(),
            "processing 75% (3/4)"
        );
        assert_eq!(
            StatusLine::Retrying { remaining: 9 }.to_string(),
            "retrying in 9s"
        );
        assert_eq!(
            StatusLine::Failed {
                reason: "disk full".to_string()
            }
            .to_string(),
            "upload failed: disk full"
        );
    }

    #[test]
    fn test_fresh_slot() {
        let slot = JobSlot::default();
        assert_eq!(slot.state, JobState::Idle);
        assert!(slot.job_id.is_none());
        assert!(!slot.in_flight);
        assert_eq!(slot.progress.completed(), 0);
    }
}
