use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use node_monitor_sdk::{
    Candidate, DEFAULT_STORAGE_PORT, Node, NodeEndpoint, NodeProber, RejectReason, StatusReport,
};
use tokio::net::TcpStream;

use super::error::StatusFetchError;
use super::ports::NodeStatusApi;

/// Confirms candidates with a TCP connect followed by one status request.
///
/// Only unreachable candidates are retried, immediately and at most
/// `retry_attempts` times, so a dead port is rejected within
/// `(1 + retry_attempts) * timeout`.
pub struct PortValidator {
    status: Arc<dyn NodeStatusApi>,
    retry_attempts: u32,
}

impl PortValidator {
    pub fn new(status: Arc<dyn NodeStatusApi>, retry_attempts: u32) -> Self {
        Self {
            status,
            retry_attempts,
        }
    }

    async fn attempt(
        &self,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<StatusReport, RejectReason> {
        let address = (candidate.host.as_str(), candidate.port);
        match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Err(_) => {
                return Err(RejectReason::Unreachable(format!(
                    "connect timed out after {}ms",
                    timeout.as_millis()
                )));
            }
            Ok(Err(e)) => return Err(RejectReason::Unreachable(e.to_string())),
            // The probe connection is closed before the HTTP request opens its own
            Ok(Ok(stream)) => drop(stream),
        }

        self.status
            .fetch_status(&candidate.host, candidate.port, timeout)
            .await
            .map_err(|e| match e {
                StatusFetchError::Unreachable(message) => RejectReason::Unreachable(message),
                StatusFetchError::Status(code) => {
                    RejectReason::InvalidResponse(format!("status API returned HTTP {code}"))
                }
                StatusFetchError::Malformed(message) => RejectReason::InvalidResponse(message),
            })
    }
}

#[async_trait]
impl NodeProber for PortValidator {
    async fn probe(&self, candidate: &Candidate, timeout: Duration) -> Result<Node, RejectReason> {
        let mut retries = 0;
        loop {
            match self.attempt(candidate, timeout).await {
                Ok(report) => return Ok(confirm(candidate, report)),
                Err(reason) if reason.is_unreachable() && retries < self.retry_attempts => {
                    retries += 1;
                    tracing::debug!(
                        candidate = %candidate,
                        retry = retries,
                        error = %reason,
                        "retrying unreachable candidate"
                    );
                }
                Err(reason) => return Err(reason),
            }
        }
    }
}

fn confirm(candidate: &Candidate, report: StatusReport) -> Node {
    let storage_port = candidate
        .hint
        .container()
        .and_then(|c| c.storage_port)
        .unwrap_or(DEFAULT_STORAGE_PORT);
    let endpoint = NodeEndpoint {
        host: candidate.host.clone(),
        dashboard_port: candidate.port,
        storage_port,
    };
    Node::new(report, endpoint, candidate.hint.clone())
}
