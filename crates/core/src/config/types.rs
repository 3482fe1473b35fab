use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Addresses of the external services the workflow talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    /// Base URL of the upload service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Port of the status-channel / readiness service.
    #[serde(default = "default_status_port")]
    pub status_port: u16,

    /// Port of the streaming (ready list / manifest) service.
    #[serde(default = "default_streaming_port")]
    pub streaming_port: u16,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_port: default_status_port(),
            streaming_port: default_streaming_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_status_port() -> u16 {
    8081
}

fn default_streaming_port() -> u16 {
    8082
}

/// Upload transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Overall request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Chunk size for streaming the multipart body, which bounds the
    /// granularity of transfer progress events.
    #[serde(default = "default_chunk_bytes")]
    pub progress_chunk_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            progress_chunk_bytes: default_chunk_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}
