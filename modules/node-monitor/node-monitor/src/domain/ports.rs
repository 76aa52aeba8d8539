//! Output ports (interfaces) for domain services.

use std::time::Duration;

use async_trait::async_trait;
use node_monitor_sdk::{
    AuthIdentity, MetricsSnapshot, MonitorError, Node, RegisteredNode, StatusReport,
};

use super::error::{DashboardError, StatusFetchError};

/// Reads `GET /api/sno` from a storage node.
#[async_trait]
pub trait NodeStatusApi: Send + Sync {
    /// Fetch and parse one status report. `timeout` bounds the whole exchange.
    async fn fetch_status(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<StatusReport, StatusFetchError>;
}

/// Result of a registration attempt that reached the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The node is already registered.
    Conflict,
}

/// The monitoring dashboard API.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /auth/me`
    async fn whoami(&self) -> Result<AuthIdentity, DashboardError>;

    /// `POST /storj/nodes`
    async fn create_node(&self, node: &Node) -> Result<CreateOutcome, DashboardError>;

    /// `PATCH /storj/nodes/{nodeId}` with the registration payload
    async fn update_node(&self, node: &Node) -> Result<(), DashboardError>;

    /// `GET /storj/nodes`
    async fn list_nodes(&self) -> Result<Vec<RegisteredNode>, DashboardError>;

    /// `PATCH /storj/nodes/{id}` with a metrics payload
    async fn push_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), DashboardError>;
}

/// Running container as listed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
}

/// Published port of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub container_port: u16,
    pub protocol: String,
    pub host_port: u16,
}

/// Inspected container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub image: String,
    /// `KEY=value` entries.
    pub env: Vec<String>,
    pub ports: Vec<PortBinding>,
}

impl ContainerDetails {
    /// Value of an environment variable, if set.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }

    /// Host port published for `container_port`/tcp.
    #[must_use]
    pub fn tcp_binding(&self, container_port: u16) -> Option<u16> {
        self.ports
            .iter()
            .find(|b| b.container_port == container_port && b.protocol == "tcp")
            .map(|b| b.host_port)
    }
}

/// Container runtime (Docker Engine API).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_running(&self) -> Result<Vec<ContainerSummary>, MonitorError>;

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, MonitorError>;
}
