//! Storage node discovery, registration and metrics sync.
//!
//! Discovery probes candidate ports (explicit, ranged or from Docker
//! containers), confirms live nodes through their status API and registers
//! them with the dashboard. The sync engine then polls every registered node
//! on an interval and pushes fresh metrics.
//!
//! The public contracts live in `node-monitor-sdk` and are re-exported here.

pub use node_monitor_sdk::{
    AuthIdentity, Candidate, CandidateSource, MetricsSnapshot, MonitorError, Node, NodeId,
    NodeProber, NodeStats, NodeStatus, PollError, RegisteredNode, RegistrationSummary,
    RejectReason, SyncOutcome, TickSummary,
};

pub mod config;
pub mod domain;
pub mod infra;

pub use config::{ApiConfig, BackoffConfig, DiscoveryConfig, FatalPolicy, SyncConfig};
pub use domain::{
    DiscoveryEngine, MetricsPoller, PortValidator, Registrar, ScanReport, SyncEngine, SyncState,
};
pub use infra::dashboard::DashboardClient;
pub use infra::docker::DockerClient;
pub use infra::status_api::StatusApiClient;
