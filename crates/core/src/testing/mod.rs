//! Testing utilities and mock implementations for lifecycle tests.
//!
//! This module provides mock implementations of all external service traits,
//! allowing comprehensive workflow testing without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use uplift_core::testing::{MockStatusConnector, MockUploadClient, ScriptedUpload};
//!
//! let client = MockUploadClient::new();
//! let connector = MockStatusConnector::new();
//!
//! // Configure mock responses
//! client.push_response(ScriptedUpload::Accept {
//!     job_id: "v1".to_string(),
//!     status_url: None,
//! });
//!
//! // Drive the status channel from the test
//! connector.latest().await.unwrap().push_text(fixtures::progress_frame(2));
//! ```

mod mock_playback_engine;
mod mock_ready_client;
mod mock_status_connector;
mod mock_upload_client;

pub use mock_playback_engine::MockPlaybackEngine;
pub use mock_ready_client::MockReadyClient;
pub use mock_status_connector::{MockConnection, MockStatusConnector};
pub use mock_upload_client::{MockUploadClient, RecordedUpload, ScriptedUpload};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::upload::UploadPayload;

    /// Create a small test payload with reasonable defaults.
    pub fn payload(file_name: &str) -> UploadPayload {
        UploadPayload::new(file_name, "video/mp4", vec![0u8; 4096])
    }

    /// A `meta` status frame announcing the total segment count.
    pub fn meta_frame(total_segments: u32) -> String {
        format!(r#"{{"type":"meta","totalSegments":{total_segments}}}"#)
    }

    /// A `progress` status frame with an absolute completed count.
    pub fn progress_frame(completed_segments: u32) -> String {
        format!(r#"{{"type":"progress","completedSegments":{completed_segments}}}"#)
    }

    /// A `failed` status frame.
    pub fn failed_frame(reason: &str) -> String {
        format!(r#"{{"type":"failed","reason":"{reason}"}}"#)
    }

    /// An untyped per-task completion frame.
    pub fn task_done_frame(task_id: &str) -> String {
        format!(r#"{{"taskId":"{task_id}"}}"#)
    }
}
