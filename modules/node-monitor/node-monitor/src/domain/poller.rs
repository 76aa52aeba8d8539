use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use node_monitor_sdk::{DEFAULT_DASHBOARD_PORT, MetricsSnapshot, PollError, RegisteredNode};

use super::error::StatusFetchError;
use super::ports::NodeStatusApi;

/// Reads current metrics from a registered node's status API.
pub struct MetricsPoller {
    status: Arc<dyn NodeStatusApi>,
    timeout: Duration,
}

impl MetricsPoller {
    pub fn new(status: Arc<dyn NodeStatusApi>, timeout: Duration) -> Self {
        Self { status, timeout }
    }

    /// Poll one node.
    ///
    /// # Errors
    /// - [`PollError::Unreachable`] on transport failure or timeout
    /// - [`PollError::Unauthorized`] when the node answers 401/403
    /// - [`PollError::MalformedResponse`] for other statuses or bad JSON
    pub async fn poll(&self, node: &RegisteredNode) -> Result<MetricsSnapshot, PollError> {
        let port = if node.dashboard_port == 0 {
            DEFAULT_DASHBOARD_PORT
        } else {
            node.dashboard_port
        };

        let fetch = self.status.fetch_status(&node.address, port, self.timeout);
        let report = match tokio::time::timeout(self.timeout, fetch).await {
            Err(_) => {
                return Err(PollError::Unreachable(format!(
                    "no response within {}ms",
                    self.timeout.as_millis()
                )));
            }
            Ok(result) => result.map_err(|e| match e {
                StatusFetchError::Unreachable(message) => PollError::Unreachable(message),
                StatusFetchError::Status(code @ (401 | 403)) => PollError::Unauthorized(code),
                StatusFetchError::Status(code) => {
                    PollError::MalformedResponse(format!("status API returned HTTP {code}"))
                }
                StatusFetchError::Malformed(message) => PollError::MalformedResponse(message),
            })?,
        };

        if report.node_id.as_str() != node.node_id {
            tracing::debug!(
                registered = %node.node_id,
                reported = %report.node_id,
                "node id differs from dashboard record"
            );
        }

        Ok(MetricsSnapshot {
            node_id: node.id.clone(),
            metrics: report.stats,
            collected_at: Utc::now(),
        })
    }
}
