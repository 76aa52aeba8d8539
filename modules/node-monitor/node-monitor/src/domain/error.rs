//! Errors raised by the output ports.

use node_monitor_sdk::MonitorError;
use thiserror::Error;

/// Failure talking to the dashboard API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// 401 or 403: the token is not accepted.
    #[error("dashboard rejected the API token (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other unexpected status.
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("dashboard unreachable: {0}")]
    Unreachable(String),

    /// A 2xx response whose body could not be decoded.
    #[error("malformed dashboard response: {0}")]
    Malformed(String),
}

impl DashboardError {
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<DashboardError> for MonitorError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Unauthorized { .. } => MonitorError::authentication(err.to_string()),
            DashboardError::Unreachable(message) => MonitorError::unreachable("dashboard", message),
            DashboardError::Status { .. } | DashboardError::Malformed(_) => {
                MonitorError::invalid_response(err.to_string())
            }
        }
    }
}

/// Failure reading a node's status API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusFetchError {
    #[error("{0}")]
    Unreachable(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err: MonitorError = DashboardError::Unauthorized { status: 401 }.into();
        assert!(matches!(err, MonitorError::Authentication { .. }));
    }

    #[test]
    fn status_message_carries_body() {
        let err = DashboardError::Status {
            status: 422,
            body: "quota exceeded".to_owned(),
        };
        assert_eq!(err.to_string(), "status 422: quota exceeded");
    }
}
