//! Node monitor domain models.
//!
//! These are transport-agnostic models shared by discovery and sync.
//! Note: NO serde derives here. Wire DTOs live in the implementation crate.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::errors::MonitorError;

/// Dashboard port a storage node listens on when nothing else is known.
pub const DEFAULT_DASHBOARD_PORT: u16 = 14002;

/// Storage (peer) port a storage node listens on when nothing else is known.
pub const DEFAULT_STORAGE_PORT: u16 = 28967;

/// Audit score below which an otherwise healthy node is reported as `WARNING`.
pub const AUDIT_WARNING_THRESHOLD: f64 = 0.95;

/// Storage node identity as reported by the node's own status API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Returns `None` for empty or whitespace-only identifiers.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, as shown in log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Container a candidate was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Published storage port, when the container exposes one.
    pub storage_port: Option<u16>,
}

/// Where a candidate (and the node confirmed from it) came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHint {
    ExplicitPort,
    PortRange,
    Container(ContainerRef),
}

impl SourceHint {
    /// Value of `config.detectedFrom` in the registration payload.
    #[must_use]
    pub fn detected_from(&self) -> &'static str {
        match self {
            Self::ExplicitPort | Self::PortRange => "port_scan",
            Self::Container(_) => "docker",
        }
    }

    #[must_use]
    pub fn container(&self) -> Option<&ContainerRef> {
        match self {
            Self::Container(c) => Some(c),
            Self::ExplicitPort | Self::PortRange => None,
        }
    }
}

/// Unvalidated `(host, port)` pair considered during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub host: String,
    pub port: u16,
    pub hint: SourceHint,
}

impl Candidate {
    pub fn new(host: impl Into<String>, port: u16, hint: SourceHint) -> Self {
        Self {
            host: host.into(),
            port,
            hint,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Health classification sent to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Online,
    Offline,
    Warning,
    Suspended,
    Disqualified,
}

impl NodeStatus {
    /// Classify a node from its status report.
    ///
    /// Checks run in order: no successful contact means `Offline`, then
    /// disqualification, then any suspension score above zero, then an audit
    /// score under [`AUDIT_WARNING_THRESHOLD`]. Missing scores count as healthy.
    #[must_use]
    pub fn derive(
        has_contact: bool,
        disqualified: bool,
        audit_score: Option<f64>,
        suspension_score: Option<f64>,
    ) -> Self {
        if !has_contact {
            return Self::Offline;
        }
        if disqualified {
            return Self::Disqualified;
        }
        if suspension_score.unwrap_or(0.0) > 0.0 {
            return Self::Suspended;
        }
        if audit_score.unwrap_or(1.0) < AUDIT_WARNING_THRESHOLD {
            return Self::Warning;
        }
        Self::Online
    }

    /// Upper-case wire representation.
    #[must_use]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Warning => "WARNING",
            Self::Suspended => "SUSPENDED",
            Self::Disqualified => "DISQUALIFIED",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disk usage in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskSpace {
    pub used: u64,
    pub available: u64,
    pub trash: u64,
    /// `used + available`, saturating.
    pub total: u64,
}

impl DiskSpace {
    #[must_use]
    pub fn new(used: u64, available: u64, trash: u64) -> Self {
        Self {
            used,
            available,
            trash,
            total: used.saturating_add(available),
        }
    }
}

/// Bandwidth counters for the current period, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bandwidth {
    pub used: u64,
    pub available: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteLink {
    pub id: String,
    pub url: String,
    pub disqualified: bool,
    pub suspended: bool,
}

/// Metrics read from a node's status API.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
    pub version: String,
    pub status: NodeStatus,
    pub disk_space: DiskSpace,
    pub bandwidth: Bandwidth,
    /// Current-month payout estimate, when the node reports one.
    pub earnings: Option<f64>,
    pub audit_score: Option<f64>,
    pub suspension_score: Option<f64>,
    /// Seconds since the node process started.
    pub uptime: u64,
    pub last_contact: Option<DateTime<Utc>>,
    pub satellites: Vec<SatelliteLink>,
}

/// A fully parsed status response.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub node_id: NodeId,
    pub stats: NodeStats,
}

/// Where a node is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub host: String,
    pub dashboard_port: u16,
    pub storage_port: u16,
}

/// A validated, identified storage node.
///
/// Built in one step from a [`StatusReport`]; the identity cannot change
/// after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    node_id: NodeId,
    pub endpoint: NodeEndpoint,
    pub stats: NodeStats,
    pub origin: SourceHint,
}

impl Node {
    #[must_use]
    pub fn new(report: StatusReport, endpoint: NodeEndpoint, origin: SourceHint) -> Self {
        Self {
            node_id: report.node_id,
            endpoint,
            stats: report.stats,
            origin,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Container name for container-derived nodes, `Node-{port}` otherwise.
    #[must_use]
    pub fn name(&self) -> String {
        match self.origin.container() {
            Some(c) if !c.name.is_empty() => c.name.clone(),
            _ => format!("Node-{}", self.endpoint.dashboard_port),
        }
    }
}

/// Outcome of registering one node with the dashboard.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub node: Node,
    pub accepted: bool,
    /// Rejection reason, or `updated` when an existing entry was refreshed.
    pub reason: Option<String>,
    /// Set for rejected nodes.
    pub error: Option<MonitorError>,
}

impl RegistrationResult {
    #[must_use]
    pub fn accepted(node: Node, reason: Option<String>) -> Self {
        Self {
            node,
            accepted: true,
            reason,
            error: None,
        }
    }

    pub fn rejected(node: Node, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let error = MonitorError::registration_rejected(node.node_id().short(), reason.clone());
        Self {
            node,
            accepted: false,
            reason: Some(reason),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationSummary {
    pub accepted: usize,
    pub results: Vec<RegistrationResult>,
}

impl RegistrationSummary {
    #[must_use]
    pub fn from_results(results: Vec<RegistrationResult>) -> Self {
        let accepted = results.iter().filter(|r| r.accepted).count();
        Self { accepted, results }
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.results.len() - self.accepted
    }
}

/// A node as the dashboard knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredNode {
    /// Dashboard-side record id, used in update URLs.
    pub id: String,
    pub node_id: String,
    pub address: String,
    pub dashboard_port: u16,
}

/// Metrics collected from one registered node during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Dashboard record id the snapshot belongs to.
    pub node_id: String,
    pub metrics: NodeStats,
    pub collected_at: DateTime<Utc>,
}

/// Result of syncing one node in one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub node: RegisteredNode,
    pub success: bool,
    pub error: Option<String>,
    pub retries_used: u32,
}

impl SyncOutcome {
    #[must_use]
    pub fn succeeded(node: RegisteredNode, retries_used: u32) -> Self {
        Self {
            node,
            success: true,
            error: None,
            retries_used,
        }
    }

    pub fn failed(node: RegisteredNode, error: impl Into<String>, retries_used: u32) -> Self {
        Self {
            node,
            success: false,
            error: Some(error.into()),
            retries_used,
        }
    }
}

/// Aggregated outcomes of one tick.
///
/// Outcomes are stored in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub outcomes: Vec<SyncOutcome>,
    pub batches: usize,
    pub deadline_exceeded: bool,
    pub cancelled: bool,
}

impl TickSummary {
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Account behind a dashboard API token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthIdentity {
    pub email: Option<String>,
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(id: &str) -> RegisteredNode {
        RegisteredNode {
            id: id.to_owned(),
            node_id: format!("node-{id}"),
            address: "127.0.0.1".to_owned(),
            dashboard_port: DEFAULT_DASHBOARD_PORT,
        }
    }

    #[test]
    fn tick_summary_counts_outcomes() {
        let mut summary = TickSummary::new(7);
        summary.outcomes.push(SyncOutcome::succeeded(registered("a"), 0));
        summary.outcomes.push(SyncOutcome::failed(registered("b"), "timeout", 3));
        summary.outcomes.push(SyncOutcome::succeeded(registered("c"), 1));

        assert_eq!(summary.tick, 7);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn node_id_rejects_blank() {
        assert!(NodeId::parse("").is_none());
        assert!(NodeId::parse("   ").is_none());
        assert_eq!(NodeId::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn node_id_short_form() {
        let id = NodeId::parse("ABCDEF1234567890").unwrap();
        assert_eq!(id.short(), "ABCDEF12");
        assert_eq!(NodeId::parse("ABC").unwrap().short(), "ABC");
    }

    #[test]
    fn status_derivation_order() {
        assert_eq!(
            NodeStatus::derive(false, true, Some(0.1), Some(1.0)),
            NodeStatus::Offline
        );
        assert_eq!(
            NodeStatus::derive(true, true, Some(1.0), Some(0.0)),
            NodeStatus::Disqualified
        );
        assert_eq!(
            NodeStatus::derive(true, false, Some(0.5), Some(0.2)),
            NodeStatus::Suspended
        );
        assert_eq!(
            NodeStatus::derive(true, false, Some(0.94), None),
            NodeStatus::Warning
        );
        assert_eq!(
            NodeStatus::derive(true, false, None, None),
            NodeStatus::Online
        );
        assert_eq!(NodeStatus::Disqualified.to_string(), "DISQUALIFIED");
    }

    #[test]
    fn disk_total_saturates() {
        assert_eq!(DiskSpace::new(5, 7, 0).total, 12);
        assert_eq!(DiskSpace::new(u64::MAX, 1, 0).total, u64::MAX);
    }

    #[test]
    fn node_name_prefers_container() {
        let stats = NodeStats {
            version: "1.0.0".to_owned(),
            status: NodeStatus::Online,
            disk_space: DiskSpace::default(),
            bandwidth: Bandwidth::default(),
            earnings: None,
            audit_score: None,
            suspension_score: None,
            uptime: 0,
            last_contact: None,
            satellites: Vec::new(),
        };
        let report = StatusReport {
            node_id: NodeId::parse("n1").unwrap(),
            stats,
        };
        let endpoint = NodeEndpoint {
            host: "127.0.0.1".to_owned(),
            dashboard_port: 14002,
            storage_port: DEFAULT_STORAGE_PORT,
        };
        let scanned = Node::new(report.clone(), endpoint.clone(), SourceHint::ExplicitPort);
        assert_eq!(scanned.name(), "Node-14002");

        let container = SourceHint::Container(ContainerRef {
            id: "c0ffee".to_owned(),
            name: "storagenode".to_owned(),
            image: "storjlabs/storagenode:latest".to_owned(),
            storage_port: None,
        });
        let from_docker = Node::new(report, endpoint, container);
        assert_eq!(from_docker.name(), "storagenode");
        assert_eq!(from_docker.origin.detected_from(), "docker");
    }
}
