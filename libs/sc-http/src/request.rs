use crate::client::{BufferedService, map_buffer_error};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::{HttpResponse, ResponseBody};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use serde::Serialize;
use tower::{Service, ServiceExt};

/// Body type for the request builder
#[derive(Clone, Debug)]
enum BodyKind {
    Empty,
    Json(Bytes),
}

/// HTTP request builder with fluent API
///
/// Created by [`HttpClient::get`](crate::HttpClient::get) and friends. Errors
/// from header building are deferred to [`send()`](RequestBuilder::send).
#[must_use = "RequestBuilder does nothing until .send() is called"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    method: http::Method,
    url: String,
    headers: Vec<(http::header::HeaderName, http::header::HeaderValue)>,
    body: BodyKind,
    error: Option<HttpError>,
    transport_security: TransportSecurity,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        method: http::Method,
        url: String,
        transport_security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            headers: Vec::new(),
            body: BodyKind::Empty,
            error: None,
            transport_security,
        }
    }

    /// Add a single header to the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (
            http::header::HeaderName::try_from(name),
            http::header::HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.push((name, value));
            }
            (Err(e), _) => {
                self.error = Some(HttpError::InvalidHeaderName(e));
            }
            (_, Err(e)) => {
                self.error = Some(HttpError::InvalidHeaderValue(e));
            }
        }
        self
    }

    /// Attach an `Authorization: Bearer <token>` header.
    ///
    /// The header value is marked sensitive so it is never printed by
    /// `Debug` implementations of the request.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match http::header::HeaderValue::try_from(format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.push((http::header::AUTHORIZATION, value));
            }
            Err(e) => self.error = Some(HttpError::InvalidHeaderValue(e)),
        }
        self
    }

    /// Set request body as JSON
    ///
    /// Sets Content-Type to `application/json` unless one was provided.
    ///
    /// # Errors
    ///
    /// Returns `Err(HttpError::Json)` if serialization fails, or a deferred
    /// header error.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let json_bytes = serde_json::to_vec(body)?;
        self.body = BodyKind::Json(Bytes::from(json_bytes));
        Ok(self)
    }

    /// Validate URL and scheme against transport security configuration.
    fn validate_url(&self) -> Result<http::Uri, HttpError> {
        let uri: http::Uri =
            self.url
                .parse()
                .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
                    url: self.url.clone(),
                    kind: InvalidUriKind::ParseError,
                    reason: e.to_string(),
                })?;

        if uri.authority().is_none() {
            return Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match uri.scheme_str() {
            Some("https") => Ok(uri),
            Some("http") => match self.transport_security {
                TransportSecurity::AllowInsecureHttp => Ok(uri),
                TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                }),
            },
            Some(scheme) => Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    /// Send the request and return the response.
    ///
    /// Returns `Ok` for every HTTP status; use
    /// [`HttpResponse::error_for_status`] or [`HttpResponse::json`] to turn
    /// non-2xx into errors.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if request building failed, the URL scheme is not
    /// allowed, or on transport failure or timeout.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let uri = self.validate_url()?;
        let mut builder = Request::builder().method(self.method).uri(uri);

        let has_content_type = self
            .headers
            .iter()
            .any(|(name, _)| name == http::header::CONTENT_TYPE);
        if !has_content_type && matches!(self.body, BodyKind::Json(_)) {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
        }

        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        let body_bytes = match self.body {
            BodyKind::Empty => Bytes::new(),
            BodyKind::Json(b) => b,
        };
        let request = builder.body(Full::new(body_bytes))?;

        let inner: Response<ResponseBody> = self
            .service
            .ready()
            .await
            .map_err(map_buffer_error)?
            .call(request)
            .await
            .map_err(map_buffer_error)?;

        Ok(HttpResponse::new(inner, self.max_body_size))
    }
}

#[cfg(test)]
mod tests {
    use crate::{HttpClient, HttpError, InvalidUriKind};
    use httpmock::prelude::*;
    use serde_json::json;

    fn client() -> HttpClient {
        HttpClient::builder().allow_insecure_http().build().unwrap()
    }

    #[tokio::test]
    async fn test_bearer_auth_and_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/storj/nodes")
                .header("authorization", "Bearer secret-token")
                .header("content-type", "application/json")
                .json_body(json!({"nodeId": "abc"}));
            then.status(201);
        });

        let resp = client()
            .post(&server.url("/storj/nodes"))
            .bearer_auth("secret-token")
            .json(&json!({"nodeId": "abc"}))
            .unwrap()
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::CREATED);
        mock.assert();
    }

    #[tokio::test]
    async fn test_tls_only_rejects_http() {
        let client = HttpClient::builder().build().unwrap();
        let err = client
            .get("http://127.0.0.1:1/anything")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let err = client().get("/api/sno").send().await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: InvalidUriKind::MissingAuthority,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_header_is_deferred() {
        let err = client()
            .get("http://127.0.0.1:1/")
            .header("bad header", "x")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeaderName(_)));
    }
}
