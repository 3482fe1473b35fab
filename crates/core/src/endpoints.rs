//! Address derivation for the external services.
//!
//! The upload response may hand back an explicit status-channel address;
//! everything else is derived from the configured base URL the same way the
//! original frontend did: strip the scheme, strip the port, re-attach the
//! per-service port.

use crate::config::EndpointsConfig;

/// `http` or `https`, taken from a base URL.
fn scheme_of(url: &str) -> &'static str {
    if url.starts_with("https://") {
        "https"
    } else {
        "http"
    }
}

/// Host of a URL: scheme stripped, trailing `:port` stripped.
fn host_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("wss://"))
        .or_else(|| url.strip_prefix("ws://"))
        .unwrap_or(url);
    let rest = rest.split('/').next().unwrap_or(rest);
    match rest.rfind(':') {
        Some(idx) if rest[idx + 1..].chars().all(|c| c.is_ascii_digit()) => &rest[..idx],
        _ => rest,
    }
}

/// Authority (`host:port` or bare host) of a URL, scheme stripped.
fn authority_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("wss://"))
        .or_else(|| url.strip_prefix("ws://"))
        .unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

impl EndpointsConfig {
    /// `POST {base}/upload`, with a `videoId` query parameter on retry so
    /// the backend can resume or replace prior work for that identifier.
    pub fn upload_url(&self, retry_of: Option<&str>) -> String {
        let base = self.base_url.trim_end_matches('/');
        match retry_of {
            Some(job_id) => format!("{}/upload?videoId={}", base, urlencoding::encode(job_id)),
            None => format!("{base}/upload"),
        }
    }

    /// Status channel address when the upload response did not supply one:
    /// `{ws|wss}://{host}:{status_port}/upload-status?jobId={id}`.
    pub fn derive_status_url(&self, job_id: &str) -> String {
        let scheme = if scheme_of(&self.base_url) == "https" {
            "wss"
        } else {
            "ws"
        };
        format!(
            "{}://{}:{}/upload-status?jobId={}",
            scheme,
            host_of(&self.base_url),
            self.status_port,
            urlencoding::encode(job_id)
        )
    }

    /// Readiness probe address. Host and port come from the status-channel
    /// address when one was supplied, else from the base URL plus the
    /// configured status port.
    pub fn upload_info_url(&self, job_id: &str, status_url: Option<&str>) -> String {
        let scheme = scheme_of(&self.base_url);
        match status_url {
            Some(status) => format!(
                "{}://{}/upload-info/{}",
                scheme,
                authority_of(status),
                job_id
            ),
            None => format!(
                "{}://{}:{}/upload-info/{}",
                scheme,
                host_of(&self.base_url),
                self.status_port,
                job_id
            ),
        }
    }

    /// `GET {scheme}://{host}:{streaming_port}/stream/ready`
    pub fn ready_list_url(&self) -> String {
        format!(
            "{}://{}:{}/stream/ready",
            scheme_of(&self.base_url),
            host_of(&self.base_url),
            self.streaming_port
        )
    }

    /// Streaming manifest address, consumed by the playback engine.
    pub fn manifest_url(&self, job_id: &str) -> String {
        format!(
            "{}://{}:{}/stream/{}/manifest",
            scheme_of(&self.base_url),
            host_of(&self.base_url),
            self.streaming_port,
            job_id
        )
    }
}
