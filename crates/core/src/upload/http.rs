//! HTTP implementation of the upload client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use serde::Deserialize;
use tracing::debug;

use crate::config::{EndpointsConfig, UploadConfig};
use crate::journal::{JournalHandle, WorkflowEvent};

use super::traits::UploadClient;
use super::types::{UploadAccepted, UploadError, UploadInfo, UploadPayload};

/// 202 response body. The job identifier is tolerated under several
/// spellings; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct UploadResponseBody {
    #[serde(rename = "videoId", alias = "video_id", alias = "id", default)]
    video_id: Option<String>,
    #[serde(rename = "uploadStatusUrl", default)]
    upload_status_url: Option<String>,
}

/// Readiness probe body; may carry the total segment count.
#[derive(Debug, Default, Deserialize)]
struct UploadInfoBody {
    #[serde(rename = "totalSegments", default)]
    total_segments: Option<u32>,
}

/// Real HTTP client for the upload service.
pub struct HttpUploadClient {
    client: Client,
    endpoints: EndpointsConfig,
    config: UploadConfig,
    journal: JournalHandle,
}

impl HttpUploadClient {
    pub fn new(endpoints: EndpointsConfig, config: UploadConfig, journal: JournalHandle) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoints,
            config,
            journal,
        }
    }

    /// Wrap the payload in a chunked stream that reports transfer progress
    /// into the journal as bytes go out.
    fn progress_body(&self, payload: &UploadPayload) -> Body {
        let total = payload.bytes.len() as u64;
        let chunk_size = self.config.progress_chunk_bytes.max(1);
        let chunks: Vec<Vec<u8>> = payload
            .bytes
            .chunks(chunk_size)
            .map(|c| c.to_vec())
            .collect();

        let sent = Arc::new(AtomicU64::new(0));
        let journal = self.journal.clone();

        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let sent_bytes =
                sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            let percent = if total == 0 {
                100
            } else {
                ((sent_bytes as f64 / total as f64) * 100.0).round() as u8
            };
            journal.try_emit(WorkflowEvent::UploadProgress {
                sent_bytes,
                total_bytes: total,
                percent,
            });
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        Body::wrap_stream(stream)
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload(
        &self,
        payload: &UploadPayload,
        retry_of: Option<&str>,
    ) -> Result<UploadAccepted, UploadError> {
        let url = self.endpoints.upload_url(retry_of);
        debug!(url, file = payload.file_name, "posting upload");

        let total = payload.bytes.len() as u64;
        let part = multipart::Part::stream_with_length(self.progress_body(payload), total)
            .file_name(payload.file_name.clone())
            .mime_str(&payload.content_type)
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 202 {
            return Err(UploadError::UnexpectedStatus(status));
        }

        let text = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        // A 202 with an unreadable body is still a missing identifier, not
        // a transport failure.
        let body: UploadResponseBody = serde_json::from_str(&text).unwrap_or_default();
        let job_id = body.video_id.ok_or(UploadError::MissingJobId)?;

        Ok(UploadAccepted {
            job_id,
            status_url: body.upload_status_url,
        })
    }

    async fn fetch_upload_info(
        &self,
        job_id: &str,
        status_url: Option<&str>,
    ) -> Result<UploadInfo, UploadError> {
        let url = self.endpoints.upload_info_url(job_id, status_url);
        debug!(url, "fetching upload info");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(UploadError::UnexpectedStatus(status));
        }

        let body: UploadInfoBody = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        Ok(UploadInfo {
            total_segments: body.total_segments,
        })
    }
}
