//! HTTP implementation of the ready-list client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::EndpointsConfig;

use super::{ReadyClient, ReadyError};

/// Response body of the ready endpoint. Identifiers arrive either as a bare
/// array or wrapped in a `ready` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReadyBody {
    Wrapped { ready: Vec<String> },
    Bare(Vec<String>),
}

/// Real HTTP client for the streaming service's ready endpoint.
pub struct HttpReadyClient {
    client: Client,
    endpoints: EndpointsConfig,
}

impl HttpReadyClient {
    pub fn new(endpoints: EndpointsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, endpoints }
    }
}

#[async_trait]
impl ReadyClient for HttpReadyClient {
    async fn fetch_ready(&self) -> Result<Vec<String>, ReadyError> {
        let url = self.endpoints.ready_list_url();
        debug!(url, "fetching ready list");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReadyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ReadyError::UnexpectedStatus(status));
        }

        let body: ReadyBody = response
            .json()
            .await
            .map_err(|e| ReadyError::Transport(e.to_string()))?;

        Ok(match body {
            ReadyBody::Wrapped { ready } => ready,
            ReadyBody::Bare(ids) => ids,
        })
    }
}
