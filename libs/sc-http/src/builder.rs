use crate::client::{BufferedService, HttpClient};
use crate::config::{HttpClientConfig, TransportSecurity};
use crate::error::HttpError;
use crate::response::box_response;
use crate::tls;
use bytes::Bytes;
use http::Request;
use http::header::{HeaderValue, USER_AGENT};
use http_body_util::Full;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::{ServiceBuilder, ServiceExt};

/// Builder for constructing an [`HttpClient`].
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set transport security mode
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow plain HTTP connections.
    ///
    /// Equivalent to `.transport(TransportSecurity::AllowInsecureHttp)`.
    #[must_use]
    pub fn allow_insecure_http(mut self) -> Self {
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Set the buffer capacity for concurrent request handling.
    ///
    /// A capacity of 0 is clamped to 1.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity.max(1);
        self
    }

    /// Set the maximum number of idle connections per host
    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Build the HTTP client.
    ///
    /// Must be called from within a Tokio runtime: the request buffer spawns
    /// its worker task on construction.
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not
    /// a valid header value.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        if self.config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::debug!("plain HTTP enabled for this client");
        }

        let timeout = self.config.request_timeout;
        let https = tls::build_https_connector(self.config.transport)?;

        let mut client_builder = Client::builder(TokioExecutor::new());
        // pool_timer is required for pool_idle_timeout to take effect
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host);
        if let Some(idle_timeout) = self.config.pool_idle_timeout {
            client_builder.pool_idle_timeout(idle_timeout);
        }
        let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

        let user_agent = HeaderValue::try_from(self.config.user_agent.as_str())?;

        // Request flow: Buffer -> ErrorMapping -> Timeout -> UserAgent -> hyper_client
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .map_request(move |mut request: Request<Full<Bytes>>| {
                request
                    .headers_mut()
                    .entry(USER_AGENT)
                    .or_insert_with(|| user_agent.clone());
                request
            })
            .service(hyper_client)
            .map_response(box_response)
            .map_err(move |e: tower::BoxError| map_tower_error(e, timeout))
            .boxed_clone();

        let service: BufferedService = Buffer::new(service, self.config.buffer_capacity.max(1));

        Ok(HttpClient {
            service,
            max_body_size: self.config.max_body_size,
            transport_security: self.config.transport,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map tower errors to `HttpError`, keeping the configured timeout duration.
fn map_tower_error(err: tower::BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }

    match err.downcast::<HttpError>() {
        Ok(http_err) => *http_err,
        Err(other) => HttpError::Transport(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;

    #[test]
    fn test_builder_default() {
        let builder = HttpClientBuilder::new();
        assert_eq!(builder.config.request_timeout, Duration::from_secs(30));
        assert_eq!(builder.config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(builder.config.buffer_capacity, 1024);
    }

    #[test]
    fn test_builder_setters() {
        let builder = HttpClientBuilder::new()
            .timeout(Duration::from_secs(5))
            .user_agent("custom/1.0")
            .max_body_size(1024)
            .buffer_capacity(0)
            .allow_insecure_http();

        assert_eq!(builder.config.request_timeout, Duration::from_secs(5));
        assert_eq!(builder.config.user_agent, "custom/1.0");
        assert_eq!(builder.config.max_body_size, 1024);
        assert_eq!(builder.config.buffer_capacity, 1);
        assert_eq!(
            builder.config.transport,
            TransportSecurity::AllowInsecureHttp
        );
    }

    #[test]
    fn test_map_tower_error_elapsed() {
        let err: tower::BoxError = Box::new(tower::timeout::error::Elapsed::new());
        let mapped = map_tower_error(err, Duration::from_secs(3));
        assert!(matches!(mapped, HttpError::Timeout(d) if d == Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_user_agent() {
        let result = HttpClientBuilder::new().user_agent("bad\nagent").build();
        assert!(matches!(result, Err(HttpError::InvalidHeaderValue(_))));
    }
}
