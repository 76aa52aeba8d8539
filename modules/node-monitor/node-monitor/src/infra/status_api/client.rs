use std::time::Duration;

use async_trait::async_trait;
use node_monitor_sdk::StatusReport;
use sc_http::{HttpClient, HttpClientBuilder, HttpClientConfig, HttpError};

use super::dto::StatusDto;
use crate::domain::error::StatusFetchError;
use crate::domain::ports::NodeStatusApi;

/// Plain-HTTP client for storage node status endpoints.
#[derive(Clone)]
pub struct StatusApiClient {
    http: HttpClient,
}

impl StatusApiClient {
    /// Build a client whose transport timeout is `timeout`. Must be called
    /// inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`HttpError`] if the underlying client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let http = HttpClientBuilder::with_config(HttpClientConfig::node_probe(timeout)).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl NodeStatusApi for StatusApiClient {
    async fn fetch_status(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<StatusReport, StatusFetchError> {
        let url = status_url(host, port);
        let exchange = async {
            let response = self.http.get(&url).send().await.map_err(classify)?;
            let status = response.status();
            if !status.is_success() {
                return Err(StatusFetchError::Status(status.as_u16()));
            }
            let body = response.bytes().await.map_err(classify)?;
            let dto: StatusDto = serde_json::from_slice(&body)
                .map_err(|e| StatusFetchError::Malformed(format!("invalid status JSON: {e}")))?;
            StatusReport::try_from(dto)
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| {
            StatusFetchError::Unreachable(format!(
                "no response from {url} within {}ms",
                timeout.as_millis()
            ))
        })?
    }
}

fn status_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}/api/sno")
    } else {
        format!("http://{host}:{port}/api/sno")
    }
}

fn classify(err: HttpError) -> StatusFetchError {
    match err {
        HttpError::HttpStatus { status, .. } => StatusFetchError::Status(status.as_u16()),
        HttpError::Json(e) => StatusFetchError::Malformed(e.to_string()),
        e @ HttpError::BodyTooLarge { .. } => StatusFetchError::Malformed(e.to_string()),
        e => StatusFetchError::Unreachable(e.to_string()),
    }
}
