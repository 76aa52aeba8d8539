#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use node_monitor_sdk::MonitorError;
use sc_http::{HttpClient, HttpError};
#[cfg(unix)]
use sc_http::HttpResponse;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::dto::{ContainerInspectDto, ContainerSummaryDto};
use crate::domain::ports::{ContainerDetails, ContainerRuntime, ContainerSummary};

const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("unsupported docker host '{0}' (expected unix://, tcp://, http:// or https://)")]
    UnsupportedHost(String),

    #[error("cannot connect to docker at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("docker request timed out after {0}ms")]
    Timeout(u128),

    #[error("docker request failed: {0}")]
    Http(#[from] HttpError),

    #[error("docker connection failed: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("invalid docker request: {0}")]
    Request(#[from] http::Error),

    #[error("docker API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid docker API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<DockerError> for MonitorError {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::UnsupportedHost(_) => MonitorError::configuration(err.to_string()),
            DockerError::Decode(_) => MonitorError::invalid_response(err.to_string()),
            _ => MonitorError::unreachable("docker", err.to_string()),
        }
    }
}

enum Transport {
    #[cfg(unix)]
    Unix(PathBuf),
    Http { client: HttpClient, base: String },
}

/// Minimal Docker Engine API client: list running containers and inspect one.
pub struct DockerClient {
    transport: Transport,
    endpoint: String,
    timeout: Duration,
}

impl DockerClient {
    /// Connect lazily to `docker_host` (`unix:///var/run/docker.sock`,
    /// `tcp://host:2375`, or an explicit http(s) URL). Nothing is contacted
    /// until the first request.
    ///
    /// # Errors
    /// Returns [`DockerError::UnsupportedHost`] for other schemes and
    /// [`DockerError::Http`] if the HTTP client cannot be built.
    pub fn from_host(docker_host: &str, timeout: Duration) -> Result<Self, DockerError> {
        let host = docker_host.trim();
        let transport = if let Some(path) = host.strip_prefix("unix://") {
            unix_transport(host, path)?
        } else if let Some(authority) = host.strip_prefix("tcp://") {
            http_transport(&format!("http://{}", authority.trim_end_matches('/')), timeout)?
        } else if host.starts_with("http://") || host.starts_with("https://") {
            http_transport(host.trim_end_matches('/'), timeout)?
        } else {
            return Err(DockerError::UnsupportedHost(host.to_owned()));
        };

        Ok(Self {
            transport,
            endpoint: host.to_owned(),
            timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DockerError> {
        let exchange = async {
            let response = match &self.transport {
                #[cfg(unix)]
                Transport::Unix(socket) => self.unix_get(socket, path).await?,
                Transport::Http { client, base } => client.get(&format!("{base}{path}")).send().await?,
            };
            let status = response.status();
            let body = response.bytes().await?;
            if !status.is_success() {
                return Err(DockerError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).trim().to_owned(),
                });
            }
            Ok::<T, DockerError>(serde_json::from_slice(&body)?)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| DockerError::Timeout(self.timeout.as_millis()))?
    }

    /// One request over a fresh unix socket connection.
    #[cfg(unix)]
    async fn unix_get(&self, socket: &Path, path: &str) -> Result<HttpResponse, DockerError> {
        use bytes::Bytes;
        use http_body_util::Empty;
        use hyper_util::rt::TokioIo;

        let stream = tokio::net::UnixStream::connect(socket)
            .await
            .map_err(|source| DockerError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        let (mut sender, connection) =
            hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "docker connection closed with error");
            }
        });

        let request = http::Request::get(path)
            .header(http::header::HOST, "docker")
            .body(Empty::<Bytes>::new())?;
        let response = sender.send_request(request).await?;
        Ok(HttpResponse::from_incoming(response, MAX_BODY_SIZE))
    }
}

#[cfg(unix)]
#[allow(clippy::unnecessary_wraps)]
fn unix_transport(_host: &str, path: &str) -> Result<Transport, DockerError> {
    Ok(Transport::Unix(PathBuf::from(path)))
}

#[cfg(not(unix))]
fn unix_transport(host: &str, _path: &str) -> Result<Transport, DockerError> {
    Err(DockerError::UnsupportedHost(host.to_owned()))
}

fn http_transport(base: &str, timeout: Duration) -> Result<Transport, DockerError> {
    let mut builder = HttpClient::builder()
        .timeout(timeout)
        .max_body_size(MAX_BODY_SIZE);
    if base.starts_with("http://") {
        builder = builder.allow_insecure_http();
    }
    Ok(Transport::Http {
        client: builder.build()?,
        base: base.to_owned(),
    })
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_running(&self) -> Result<Vec<ContainerSummary>, MonitorError> {
        let containers: Vec<ContainerSummaryDto> = self.get_json("/containers/json").await?;
        tracing::debug!(count = containers.len(), endpoint = %self.endpoint, "running containers listed");
        Ok(containers.into_iter().map(ContainerSummary::from).collect())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, MonitorError> {
        let details: ContainerInspectDto = self.get_json(&format!("/containers/{id}/json")).await?;
        Ok(details.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn host_schemes() {
        let timeout = Duration::from_secs(1);
        assert!(DockerClient::from_host("tcp://127.0.0.1:2375", timeout).is_ok());
        assert!(DockerClient::from_host("https://docker.internal:2376/", timeout).is_ok());
        assert!(matches!(
            DockerClient::from_host("npipe:////./pipe/docker_engine", timeout),
            Err(DockerError::UnsupportedHost(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_socket_is_unreachable() {
        let client =
            DockerClient::from_host("unix:///nonexistent/docker.sock", Duration::from_secs(1)).unwrap();
        let err = client.list_running().await.unwrap_err();
        assert!(matches!(err, MonitorError::Unreachable { .. }));
    }
}
