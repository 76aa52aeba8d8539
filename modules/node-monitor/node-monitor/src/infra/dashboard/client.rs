use async_trait::async_trait;
use http::StatusCode;
use node_monitor_sdk::{AuthIdentity, MetricsSnapshot, MonitorError, Node, RegisteredNode};
use sc_bootstrap::ApiToken;
use sc_http::{ERROR_BODY_PREVIEW_LIMIT, HttpClient, HttpError, HttpResponse, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use super::dto::{IdentityDto, MetricsBody, NodeListResponse, RegistrationBody};
use crate::config::ApiConfig;
use crate::domain::error::DashboardError;
use crate::domain::ports::{CreateOutcome, DashboardApi};

/// Bearer-authenticated client for the monitoring dashboard API.
#[derive(Clone)]
pub struct DashboardClient {
    http: HttpClient,
    base: Url,
    token: ApiToken,
}

impl DashboardClient {
    /// Build a client from validated API settings. Must be called inside a
    /// Tokio runtime.
    ///
    /// # Errors
    /// Returns [`MonitorError::Configuration`] when the endpoint is invalid,
    /// the token is missing, or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let token = config.require_token()?.clone();
        let base = Url::parse(config.base_url()).map_err(|e| {
            MonitorError::configuration(format!("api.endpoint '{}': {e}", config.endpoint))
        })?;

        let mut builder = HttpClient::builder().timeout(config.timeout);
        if config.allow_insecure_http {
            builder = builder.allow_insecure_http();
        }
        let http = builder
            .build()
            .map_err(|e| MonitorError::configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, base, token })
    }

    /// `{endpoint}/seg1/seg2`, with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    async fn send(&self, request: RequestBuilder) -> Result<HttpResponse, DashboardError> {
        request
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(from_http)
    }

    async fn read_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DashboardError> {
        let response = self.send(self.http.get(url)).await?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(from_http)
    }

    async fn patch_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<(), DashboardError> {
        let request = self.http.patch(url).json(body).map_err(from_http)?;
        ensure_success(self.send(request).await?).await?;
        Ok(())
    }
}

#[async_trait]
impl DashboardApi for DashboardClient {
    async fn whoami(&self) -> Result<AuthIdentity, DashboardError> {
        let identity: IdentityDto = self.read_json(&self.url(&["auth", "me"])).await?;
        Ok(identity.into())
    }

    async fn create_node(&self, node: &Node) -> Result<CreateOutcome, DashboardError> {
        let body = RegistrationBody::from(node);
        let request = self
            .http
            .post(&self.url(&["storj", "nodes"]))
            .json(&body)
            .map_err(from_http)?;
        let response = self.send(request).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::Conflict);
        }
        ensure_success(response).await?;
        Ok(CreateOutcome::Created)
    }

    async fn update_node(&self, node: &Node) -> Result<(), DashboardError> {
        let body = RegistrationBody::from(node);
        let url = self.url(&["storj", "nodes", node.node_id().as_str()]);
        self.patch_json(&url, &body).await
    }

    async fn list_nodes(&self) -> Result<Vec<RegisteredNode>, DashboardError> {
        let list: NodeListResponse = self.read_json(&self.url(&["storj", "nodes"])).await?;
        Ok(list.into_nodes().into_iter().map(RegisteredNode::from).collect())
    }

    async fn push_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), DashboardError> {
        let body = MetricsBody::from(snapshot);
        let url = self.url(&["storj", "nodes", &snapshot.node_id]);
        self.patch_json(&url, &body).await
    }
}

/// Pass 2xx through; turn anything else into a [`DashboardError`] carrying
/// a preview of the body.
async fn ensure_success(response: HttpResponse) -> Result<HttpResponse, DashboardError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(DashboardError::Unauthorized {
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map(|bytes| preview(&bytes))
        .unwrap_or_default();
    Err(DashboardError::Status {
        status: status.as_u16(),
        body,
    })
}

fn preview(bytes: &[u8]) -> String {
    let end = bytes.len().min(ERROR_BODY_PREVIEW_LIMIT);
    String::from_utf8_lossy(&bytes[..end]).trim().to_owned()
}

fn from_http(err: HttpError) -> DashboardError {
    match err {
        HttpError::HttpStatus { status, .. }
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
        {
            DashboardError::Unauthorized {
                status: status.as_u16(),
            }
        }
        HttpError::HttpStatus {
            status,
            body_preview,
            ..
        } => DashboardError::Status {
            status: status.as_u16(),
            body: body_preview,
        },
        HttpError::Json(e) => DashboardError::Malformed(e.to_string()),
        e @ HttpError::BodyTooLarge { .. } => DashboardError::Malformed(e.to_string()),
        e => DashboardError::Unreachable(e.to_string()),
    }
}
