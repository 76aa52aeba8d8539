//! Candidate sources: explicit ports, port ranges and Docker containers.

use std::sync::Arc;

use async_trait::async_trait;
use node_monitor_sdk::{
    Candidate, CandidateSource, ContainerRef, DEFAULT_DASHBOARD_PORT, MonitorError, SourceHint,
};

use super::ports::{ContainerDetails, ContainerRuntime};

/// Published-side host of container candidates.
pub const CONTAINER_HOST: &str = "127.0.0.1";

const STORAGE_PORT_IN_CONTAINER: u16 = 28967;
const DASHBOARD_PORT_RANGE: std::ops::RangeInclusive<u16> = 14000..=15000;
const NODE_IMAGES: [&str; 2] = ["storjlabs/storagenode", "storj/storagenode"];

/// One candidate per listed port, in input order. Duplicates are kept.
#[derive(Debug, Clone)]
pub struct ExplicitPorts {
    ports: Vec<u16>,
}

impl ExplicitPorts {
    #[must_use]
    pub fn new(ports: Vec<u16>) -> Self {
        Self { ports }
    }
}

#[async_trait]
impl CandidateSource for ExplicitPorts {
    fn name(&self) -> &'static str {
        "ports"
    }

    async fn candidates(&self, host: &str) -> Result<Vec<Candidate>, MonitorError> {
        Ok(self
            .ports
            .iter()
            .map(|&port| Candidate::new(host, port, SourceHint::ExplicitPort))
            .collect())
    }
}

/// Every port in `start..=end`.
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// # Errors
    /// Returns [`MonitorError::Configuration`] when `start > end`.
    pub fn new(start: u16, end: u16) -> Result<Self, MonitorError> {
        if start > end {
            return Err(MonitorError::configuration(format!(
                "port range start {start} is greater than end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `start-end`.
    ///
    /// # Errors
    /// Returns [`MonitorError::Configuration`] for malformed or inverted ranges.
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        let invalid = || MonitorError::configuration(format!("invalid port range '{raw}'"));
        let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse().map_err(|_| invalid())?;
        let end = end.trim().parse().map_err(|_| invalid())?;
        Self::new(start, end)
    }
}

#[async_trait]
impl CandidateSource for PortRange {
    fn name(&self) -> &'static str {
        "range"
    }

    async fn candidates(&self, host: &str) -> Result<Vec<Candidate>, MonitorError> {
        Ok((self.start..=self.end)
            .map(|port| Candidate::new(host, port, SourceHint::PortRange))
            .collect())
    }
}

/// Storage node containers found through a [`ContainerRuntime`].
///
/// The requested host is ignored: published ports are reached on loopback.
pub struct ContainerSource {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerSource {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl CandidateSource for ContainerSource {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn candidates(&self, _host: &str) -> Result<Vec<Candidate>, MonitorError> {
        let containers = self.runtime.list_running().await?;
        let mut candidates = Vec::new();

        for summary in containers
            .iter()
            .filter(|c| is_storage_node(&c.image, &c.names))
        {
            let details = match self.runtime.inspect(&summary.id).await {
                Ok(details) => details,
                Err(e) => {
                    tracing::warn!(container = %summary.id, error = %e, "failed to inspect container");
                    continue;
                }
            };
            match container_candidate(&details) {
                Some(candidate) => candidates.push(candidate),
                None => tracing::warn!(
                    container = %details.name,
                    "no dashboard port found for storage node container"
                ),
            }
        }

        tracing::info!(count = candidates.len(), "storage node containers found");
        Ok(candidates)
    }
}

/// Known node image, or a container name mentioning storj.
#[must_use]
pub fn is_storage_node(image: &str, names: &[String]) -> bool {
    NODE_IMAGES.iter().any(|prefix| image.starts_with(prefix))
        || names.iter().any(|name| {
            let name = name.to_ascii_lowercase();
            name.contains("storj") || name.contains("storagenode")
        })
}

/// Build the candidate for one inspected container, if a dashboard port is known.
#[must_use]
pub fn container_candidate(details: &ContainerDetails) -> Option<Candidate> {
    let port = dashboard_port(details)?;
    let container = ContainerRef {
        id: details.id.clone(),
        name: details.name.trim_start_matches('/').to_owned(),
        image: details.image.clone(),
        storage_port: storage_port(details),
    };
    Some(Candidate::new(
        CONTAINER_HOST,
        port,
        SourceHint::Container(container),
    ))
}

/// Published 14002/tcp, then `CONSOLE_ADDRESS`, then any tcp port in 14000..=15000.
fn dashboard_port(details: &ContainerDetails) -> Option<u16> {
    if let Some(port) = details.tcp_binding(DEFAULT_DASHBOARD_PORT) {
        return Some(port);
    }

    if let Some(address) = details.env_var("CONSOLE_ADDRESS") {
        match address_port(address) {
            Some(port) => return Some(port),
            None => tracing::warn!(
                container = %details.name,
                value = address,
                "ignoring malformed CONSOLE_ADDRESS"
            ),
        }
    }

    let mut in_range: Vec<_> = details
        .ports
        .iter()
        .filter(|b| b.protocol == "tcp" && DASHBOARD_PORT_RANGE.contains(&b.container_port))
        .collect();
    in_range.sort_by_key(|b| b.container_port);
    in_range.first().map(|b| b.host_port)
}

/// Published 28967/tcp, then the port in `ADDRESS`.
fn storage_port(details: &ContainerDetails) -> Option<u16> {
    details
        .tcp_binding(STORAGE_PORT_IN_CONTAINER)
        .or_else(|| details.env_var("ADDRESS").and_then(address_port))
}

/// Port of a `host:port` address. Port zero counts as malformed.
fn address_port(address: &str) -> Option<u16> {
    let (_, port) = address.trim().rsplit_once(':')?;
    port.parse::<u16>().ok().filter(|p| *p != 0)
}
