//! Node monitor error types.
//!
//! `MonitorError` is what reaches the command layer. `RejectReason` and
//! `PollError` describe a single candidate or node and are recorded in
//! results instead of being propagated.

use thiserror::Error;

/// Error type for node monitor operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Invalid configuration or input; nothing was sent over the network.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A host could not be reached.
    #[error("{target} unreachable: {message}")]
    Unreachable { target: String, message: String },

    /// A peer answered with something we could not use.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// The dashboard rejected the API token for this session.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The dashboard refused to register one node.
    #[error("registration rejected for node {node_id}: {reason}")]
    RegistrationRejected { node_id: String, reason: String },

    /// A whole sync tick failed to reach the dashboard.
    #[error("systemic failure: {message}")]
    SystemicFailure { message: String },
}

impl MonitorError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unreachable error.
    pub fn unreachable(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a registration rejected error.
    pub fn registration_rejected(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RegistrationRejected {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a systemic failure error.
    pub fn systemic(message: impl Into<String>) -> Self {
        Self::SystemicFailure {
            message: message.into(),
        }
    }
}

/// Why a discovery candidate was not confirmed as a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Connection refused, timed out, or the host is unreachable.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The port answered but not with a usable node status response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RejectReason {
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Why polling a registered node failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// The node's own API answered 401 or 403.
    #[error("node refused access (HTTP {0})")]
    Unauthorized(u16),

    #[error("malformed node response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = MonitorError::registration_rejected("ABCDEF12", "status 422: quota exceeded");
        assert_eq!(
            err.to_string(),
            "registration rejected for node ABCDEF12: status 422: quota exceeded"
        );
        assert_eq!(
            PollError::Unauthorized(403).to_string(),
            "node refused access (HTTP 403)"
        );
    }
}
