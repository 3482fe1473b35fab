//! Trait definitions for the upload endpoint.

use async_trait::async_trait;

use super::types::{UploadAccepted, UploadError, UploadInfo, UploadPayload};

/// Client for the upload service and its readiness probe.
///
/// Implemented by the real HTTP client and by the in-memory mock used in
/// tests. The backend itself is out of scope; only this contract matters.
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// POST the payload to the upload endpoint. `retry_of` carries the
    /// previously assigned job identifier when resubmitting, so the backend
    /// can resume or replace prior work.
    ///
    /// Success means HTTP 202 with a job identifier in the body; a 202
    /// without an identifier is [`UploadError::MissingJobId`].
    async fn upload(
        &self,
        payload: &UploadPayload,
        retry_of: Option<&str>,
    ) -> Result<UploadAccepted, UploadError>;

    /// Best-effort readiness probe for a just-accepted job. Failures are
    /// reported by the caller but never alter job state.
    async fn fetch_upload_info(
        &self,
        job_id: &str,
        status_url: Option<&str>,
    ) -> Result<UploadInfo, UploadError>;
}
