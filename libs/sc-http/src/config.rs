use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("storjcloud-client/", env!("CARGO_PKG_VERSION"));

/// Maximum body preview size kept in [`HttpError::HttpStatus`](crate::HttpError::HttpStatus) (8KB).
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Transport security configuration
///
/// Controls whether the client enforces TLS or allows plain HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only)
    #[default]
    TlsOnly,
    /// Allow plain HTTP connections.
    ///
    /// Required for node status endpoints, which are served without TLS on
    /// the node host, and for local mock servers in tests.
    AllowInsecureHttp,
}

/// Overall HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout (default: 30 seconds)
    pub request_timeout: Duration,

    /// Maximum response body size in bytes (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// Buffer capacity for concurrent request handling (default: 1024)
    pub buffer_capacity: usize,

    /// Timeout for idle pooled connections (default: 90 seconds)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum number of idle connections per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Configuration for talking to storage node status endpoints.
    ///
    /// Plain HTTP, small bodies, and no idle pooling: nodes are polled once
    /// per tick, so keeping sockets open between ticks only holds descriptors.
    #[must_use]
    pub fn node_probe(timeout: Duration) -> Self {
        Self {
            request_timeout: timeout,
            max_body_size: 2 * 1024 * 1024,
            transport: TransportSecurity::AllowInsecureHttp,
            pool_max_idle_per_host: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_tls_only() {
        let config = HttpClientConfig::default();
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("storjcloud-client/"));
    }

    #[test]
    fn test_node_probe_allows_http() {
        let config = HttpClientConfig::node_probe(Duration::from_secs(5));
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.pool_max_idle_per_host, 0);
    }
}
