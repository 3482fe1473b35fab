//! Workflow event types.

use serde::{Deserialize, Serialize};

/// Everything user-visible that happens during the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    // Upload attempt lifecycle
    UploadStarted {
        /// Present when retrying a known job.
        job_id: Option<String>,
        file_name: String,
        retry: bool,
    },
    /// Transfer progress of the multipart body.
    UploadProgress {
        sent_bytes: u64,
        total_bytes: u64,
        percent: u8,
    },
    UploadAccepted {
        job_id: String,
        status_url: Option<String>,
    },

    // Readiness probe (best-effort, non-fatal)
    ProbeCompleted {
        job_id: String,
        total_segments: Option<u32>,
    },
    ProbeFailed {
        job_id: String,
        reason: String,
    },

    // Status channel
    ChannelConnected {
        token: u64,
        url: String,
    },
    /// Raw inbound frame, recorded verbatim.
    ChannelMessage {
        token: u64,
        raw: String,
    },
    ChannelClosed {
        token: u64,
    },
    ChannelError {
        token: u64,
        reason: String,
    },
    /// An event from a superseded session was dropped.
    StaleEventDropped {
        token: u64,
        current: u64,
    },

    // Job state machine
    JobStateChanged {
        job_id: Option<String>,
        from_state: String,
        to_state: String,
        reason: Option<String>,
    },
    ProcessingProgress {
        completed: u32,
        total: Option<u32>,
        display: String,
    },
    JobCompleted {
        job_id: String,
    },

    // Retry cycle
    RetryScheduled {
        job_id: String,
        reason: String,
        budget: u32,
    },
    RetryCountdown {
        remaining: u32,
        display: String,
    },
    RetryAttempt {
        job_id: String,
    },
    RetryExhausted {
        job_id: Option<String>,
    },

    // Ready list
    ReadyListRefreshed {
        jobs: Vec<String>,
        selected: Option<String>,
    },
    ReadyListFetchFailed {
        reason: String,
    },

    // Playback
    PlaybackAttached {
        job_id: String,
        engine: String,
        manifest_url: String,
    },
    PlaybackDetached {
        engine: String,
    },
    PlaybackUnavailable {
        job_id: String,
        reason: String,
    },
}
