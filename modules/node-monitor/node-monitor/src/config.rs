//! Node monitor configuration sections.
//!
//! Each section is deserialized with `#[serde(default)]`, so a config file
//! only needs the keys it changes.

use std::time::Duration;

use node_monitor_sdk::MonitorError;
use sc_bootstrap::ApiToken;
use sc_bootstrap::config::duration_serde;
use sc_http::{Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};

/// Dashboard API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Bearer token for the dashboard API. Never serialized.
    #[serde(skip_serializing)]
    pub token: Option<ApiToken>,

    /// Base URL of the dashboard API.
    pub endpoint: String,

    /// Per-request timeout.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Permit a plain `http://` endpoint (local development dashboards).
    pub allow_insecure_http: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: "https://storj.cloud/api/v1".to_owned(),
            timeout: Duration::from_secs(30),
            allow_insecure_http: false,
        }
    }
}

impl ApiConfig {
    /// The configured token, if it is present and not blank.
    ///
    /// # Errors
    /// Returns [`MonitorError::Configuration`] pointing at the page where a
    /// token can be created.
    pub fn require_token(&self) -> Result<&ApiToken, MonitorError> {
        match &self.token {
            Some(token) if !token.is_blank() => Ok(token),
            _ => Err(MonitorError::configuration(format!(
                "API token is required; create one at {}/settings/api-tokens and pass it with \
                 --token or STORJCLOUD_API_TOKEN",
                self.dashboard_base()
            ))),
        }
    }

    /// Endpoint without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// Web dashboard root (the endpoint with its `/api/...` suffix removed).
    fn dashboard_base(&self) -> &str {
        let base = self.base_url();
        base.find("/api/").map_or(base, |idx| &base[..idx])
    }

    /// # Errors
    /// Returns [`MonitorError::Configuration`] when the endpoint is not an
    /// absolute http(s) URL or the timeout is zero.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            MonitorError::configuration(format!("api.endpoint '{}': {e}", self.endpoint))
        })?;
        match url.scheme() {
            "https" => {}
            "http" if self.allow_insecure_http => {}
            "http" => {
                return Err(MonitorError::configuration(
                    "api.endpoint uses http://; set api.allow_insecure_http to permit it",
                ));
            }
            other => {
                return Err(MonitorError::configuration(format!(
                    "api.endpoint has unsupported scheme '{other}'"
                )));
            }
        }
        if url.host_str().is_none() {
            return Err(MonitorError::configuration("api.endpoint has no host"));
        }
        if self.timeout.is_zero() {
            return Err(MonitorError::configuration("api.timeout must be > 0"));
        }
        Ok(())
    }
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Look for storage node containers through the Docker Engine API.
    pub from_docker: bool,

    /// `unix:///path/to/docker.sock` or `tcp://host:port`.
    pub docker_host: String,

    /// Ports probed when neither a list nor a range is given.
    pub common_ports: Vec<u16>,

    /// Inclusive `[start, end]` range used by `--port-range` defaults.
    pub port_range: [u16; 2],

    /// Connect and request timeout for a single probe.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Extra attempts for candidates that were unreachable.
    pub retry_attempts: u32,

    /// Maximum probes in flight.
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            from_docker: true,
            docker_host: "unix:///var/run/docker.sock".to_owned(),
            common_ports: (14000..=14005).collect(),
            port_range: [14000, 14010],
            timeout: Duration::from_secs(5),
            retry_attempts: 3,
            concurrency: 16,
        }
    }
}

impl DiscoveryConfig {
    /// # Errors
    /// Returns [`MonitorError::Configuration`] for an inverted port range or
    /// a zero timeout.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let [start, end] = self.port_range;
        if start > end {
            return Err(MonitorError::configuration(format!(
                "discovery.port_range start {start} is greater than end {end}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(MonitorError::configuration("discovery.timeout must be > 0"));
        }
        Ok(())
    }
}

/// What the sync loop does after a systemic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Stop the loop and return the error.
    Terminate,
    /// Log the error and keep ticking.
    Continue,
}

/// Retry delay between attempts on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffConfig {
    Fixed {
        #[serde(with = "duration_serde", default = "default_fixed_delay")]
        delay: Duration,
    },
    Exponential {
        #[serde(with = "duration_serde", default = "default_initial")]
        initial: Duration,
        #[serde(with = "duration_serde", default = "default_max")]
        max: Duration,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        #[serde(default = "default_jitter")]
        jitter: bool,
    },
}

fn default_fixed_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_initial() -> Duration {
    Duration::from_secs(1)
}

fn default_max() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Exponential {
            initial: default_initial(),
            max: default_max(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl BackoffConfig {
    #[must_use]
    pub fn to_backoff(&self) -> Backoff {
        match self {
            Self::Fixed { delay } => Backoff::Fixed(*delay),
            Self::Exponential {
                initial,
                max,
                multiplier,
                jitter,
            } => Backoff::Exponential(ExponentialBackoff {
                initial: *initial,
                max: *max,
                multiplier: *multiplier,
                jitter: *jitter,
            }),
        }
    }
}

/// Sync loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Time between tick starts.
    #[serde(with = "duration_serde")]
    pub interval: Duration,

    /// Maximum nodes per batch.
    pub batch_size: usize,

    /// Retry nodes whose poll or push failed within the same tick.
    pub retry_failed: bool,

    /// Retries after the first attempt.
    pub max_retries: u32,

    pub backoff: BackoffConfig,

    /// Batches processed at the same time.
    pub max_parallel_batches: usize,

    /// Timeout for one node status request.
    #[serde(with = "duration_serde")]
    pub poll_timeout: Duration,

    /// Upper bound for a whole tick; defaults to 80% of the interval.
    #[serde(with = "duration_serde::option")]
    pub tick_deadline: Option<Duration>,

    /// Time in-flight work may keep running after cancellation.
    #[serde(with = "duration_serde")]
    pub grace_period: Duration,

    pub on_auth_failure: FatalPolicy,
    pub on_dashboard_unreachable: FatalPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            batch_size: 10,
            retry_failed: true,
            max_retries: 3,
            backoff: BackoffConfig::default(),
            max_parallel_batches: 2,
            poll_timeout: Duration::from_secs(10),
            tick_deadline: None,
            grace_period: Duration::from_secs(10),
            on_auth_failure: FatalPolicy::Terminate,
            on_dashboard_unreachable: FatalPolicy::Continue,
        }
    }
}

impl SyncConfig {
    /// Configured deadline, or 80% of the interval.
    #[must_use]
    pub fn effective_tick_deadline(&self) -> Duration {
        self.tick_deadline
            .unwrap_or_else(|| self.interval.mul_f64(0.8))
    }

    /// Retries allowed per node in one tick.
    #[must_use]
    pub fn retry_budget(&self) -> u32 {
        if self.retry_failed { self.max_retries } else { 0 }
    }

    /// # Errors
    /// Returns [`MonitorError::Configuration`] for a zero batch size, zero
    /// interval or zero poll timeout.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.batch_size == 0 {
            return Err(MonitorError::configuration("sync.batch_size must be >= 1"));
        }
        if self.interval.is_zero() {
            return Err(MonitorError::configuration("sync.interval must be > 0"));
        }
        if self.poll_timeout.is_zero() {
            return Err(MonitorError::configuration("sync.poll_timeout must be > 0"));
        }
        if self.tick_deadline.is_some_and(|d| d.is_zero()) {
            return Err(MonitorError::configuration("sync.tick_deadline must be > 0"));
        }
        Ok(())
    }
}
