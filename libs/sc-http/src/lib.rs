#![warn(warnings)]

//! HTTP client infrastructure for the Storj Cloud client.
//!
//! A hyper-based client shared by the dashboard API, the node status API and
//! the Docker Engine API (TCP endpoints):
//! - TLS via rustls with webpki roots (HTTPS only by default)
//! - Connection pooling through the hyper-util legacy client
//! - Per-request timeouts
//! - User-Agent header injection
//! - Size-limited body reads
//!
//! Retries are not performed here. Callers own their retry loops and use
//! [`Backoff`] to compute delays between attempts.
//!
//! # Example
//!
//! ```ignore
//! use sc_http::HttpClient;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let me: Me = client
//!     .get("https://storj.cloud/api/v1/auth/me")
//!     .bearer_auth(token)
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod backoff;
mod builder;
mod client;
mod config;
mod error;
mod request;
mod response;
mod tls;

pub use backoff::{Backoff, ExponentialBackoff};
pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, ERROR_BODY_PREVIEW_LIMIT, HttpClientConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody, read_body_limited};
