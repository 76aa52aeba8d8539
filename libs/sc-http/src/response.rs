use crate::config::ERROR_BODY_PREVIEW_LIMIT;
use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

/// Type-erased response body.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Box a hyper response body into [`ResponseBody`].
pub(crate) fn box_response(response: Response<Incoming>) -> Response<ResponseBody> {
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    Response::from_parts(parts, boxed_body)
}

/// HTTP response wrapper with body-reading helpers
///
/// - `resp.error_for_status()?` checks status without reading the body
/// - `resp.checked_bytes().await?` reads bytes with a status check
/// - `resp.json::<T>().await?` parses JSON with a status check
///
/// All body reads enforce the configured `max_body_size` limit.
#[derive(Debug)]
pub struct HttpResponse {
    inner: Response<ResponseBody>,
    max_body_size: usize,
}

impl HttpResponse {
    pub(crate) fn new(inner: Response<ResponseBody>, max_body_size: usize) -> Self {
        Self {
            inner,
            max_body_size,
        }
    }

    /// Wrap a response received over a raw hyper connection.
    ///
    /// Used for transports that bypass the pooled client (unix sockets).
    #[must_use]
    pub fn from_incoming(response: Response<Incoming>, max_body_size: usize) -> Self {
        Self::new(box_response(response), max_body_size)
    }

    /// Get the response status code
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Get the response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Return an error for non-2xx responses without reading the body.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::HttpStatus` (with an empty body preview) if the
    /// status is not 2xx.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.inner.status().is_success() {
            return Ok(self);
        }

        Err(HttpError::HttpStatus {
            status: self.inner.status(),
            body_preview: String::new(),
            content_type: content_type(self.inner.headers()),
        })
    }

    /// Read response body as bytes without status check
    ///
    /// # Errors
    /// Returns `HttpError::BodyTooLarge` if body exceeds limit.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        read_body_limited(self.inner, self.max_body_size).await
    }

    /// Read response body as bytes with status check
    ///
    /// # Errors
    /// Returns `HttpError::HttpStatus` (with a body preview) if status is not
    /// 2xx, `HttpError::BodyTooLarge` if body exceeds limit.
    pub async fn checked_bytes(self) -> Result<Bytes, HttpError> {
        checked_body(self.inner, self.max_body_size).await
    }

    /// Parse response body as JSON with status check
    ///
    /// # Errors
    /// Returns `HttpError::HttpStatus` if status is not 2xx,
    /// `HttpError::BodyTooLarge` if body exceeds limit,
    /// `HttpError::Json` if parsing fails.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let body_bytes = checked_body(self.inner, self.max_body_size).await?;
        Ok(serde_json::from_slice(&body_bytes)?)
    }

    /// Read response body as UTF-8 text (lossy) with status check
    ///
    /// # Errors
    /// Same as [`checked_bytes`](Self::checked_bytes).
    pub async fn text(self) -> Result<String, HttpError> {
        let body_bytes = checked_body(self.inner, self.max_body_size).await?;
        Ok(String::from_utf8_lossy(&body_bytes).into_owned())
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn checked_body(
    response: Response<ResponseBody>,
    max_body_size: usize,
) -> Result<Bytes, HttpError> {
    let status = response.status();

    if !status.is_success() {
        let content_type = content_type(response.headers());
        let preview_limit = max_body_size.min(ERROR_BODY_PREVIEW_LIMIT);
        let body_preview = match read_body_limited(response, preview_limit).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(HttpError::BodyTooLarge { .. }) => "<body too large for preview>".to_owned(),
            Err(e) => return Err(e),
        };

        return Err(HttpError::HttpStatus {
            status,
            body_preview,
            content_type,
        });
    }

    read_body_limited(response, max_body_size).await
}

/// Collect a response body, failing once more than `limit` bytes arrive.
///
/// # Errors
/// Returns `HttpError::BodyTooLarge` when the limit is exceeded and
/// `HttpError::Transport` when the body stream fails.
pub async fn read_body_limited(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Bytes, HttpError> {
    let (_parts, body) = response.into_parts();

    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn response(status: u16, body: &'static str) -> Response<ResponseBody> {
        let body: ResponseBody = Full::new(Bytes::from_static(body.as_bytes()))
            .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })
            .boxed();
        Response::builder().status(status).body(body).unwrap()
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let err = read_body_limited(response(200, "0123456789"), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::BodyTooLarge { limit: 4, .. }));
    }

    #[tokio::test]
    async fn test_checked_body_includes_preview() {
        let resp = HttpResponse::new(response(409, "already registered"), 1024);
        match resp.checked_bytes().await.unwrap_err() {
            HttpError::HttpStatus {
                status,
                body_preview,
                ..
            } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(body_preview, "already registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_parses_success_body() {
        #[derive(serde::Deserialize)]
        struct Body {
            ok: bool,
        }
        let resp = HttpResponse::new(response(200, r#"{"ok":true}"#), 1024);
        let body: Body = resp.json().await.unwrap();
        assert!(body.ok);
    }

    #[tokio::test]
    async fn test_json_rejects_garbage() {
        let resp = HttpResponse::new(response(200, "<html>"), 1024);
        let err = resp.json::<serde_json::Value>().await.unwrap_err();
        assert!(matches!(err, HttpError::Json(_)));
    }
}
