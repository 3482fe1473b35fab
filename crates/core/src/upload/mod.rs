//! Upload workflow: multipart submission, status subscription, retry, and
//! the job state machine.

mod http;
mod orchestrator;
mod traits;
mod types;

pub use http::HttpUploadClient;
pub use orchestrator::UploadOrchestrator;
pub use traits::UploadClient;
pub use types::{
    JobSlot, JobState, StatusLine, UploadAccepted, UploadError, UploadInfo, UploadPayload,
};
