//! Domain models to dashboard bodies and back.

use chrono::SecondsFormat;
use node_monitor_sdk::{
    AuthIdentity, DEFAULT_DASHBOARD_PORT, MetricsSnapshot, Node, RegisteredNode, SatelliteLink,
};

use super::dto::{
    IdentityDto, MetricsBody, RegisteredNodeDto, RegistrationBody, ReputationBody, SatelliteBody,
    SourceConfigBody,
};
use crate::domain::candidates::CONTAINER_HOST;

impl From<&Node> for RegistrationBody {
    fn from(node: &Node) -> Self {
        let stats = &node.stats;
        let container = node.origin.container();
        Self {
            node_id: node.node_id().to_string(),
            name: node.name(),
            address: node.endpoint.host.clone(),
            port: node.endpoint.storage_port,
            dashboard_port: node.endpoint.dashboard_port,
            version: stats.version.clone(),
            status: stats.status.as_str(),
            allocated_space: stats.disk_space.total,
            used_space: stats.disk_space.used,
            available_space: stats.disk_space.available,
            bandwidth_used: stats.bandwidth.used,
            uptime: stats.uptime,
            last_seen: stats
                .last_contact
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            config: SourceConfigBody {
                detected_from: node.origin.detected_from(),
                container_id: container.map(|c| c.id.clone()),
                container_name: container.map(|c| c.name.clone()),
                image: container.map(|c| c.image.clone()),
            },
        }
    }
}

impl From<&MetricsSnapshot> for MetricsBody {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        let stats = &snapshot.metrics;
        Self {
            status: stats.status.as_str(),
            version: stats.version.clone(),
            used_space: stats.disk_space.used,
            available_space: stats.disk_space.available,
            bandwidth_used: stats.bandwidth.used,
            uptime: stats.uptime,
            last_seen: snapshot
                .collected_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            reputation: ReputationBody {
                audit_score: stats.audit_score,
                suspension_score: stats.suspension_score,
            },
            satellites: stats.satellites.iter().map(SatelliteBody::from).collect(),
            audit_score: stats.audit_score,
            suspension_score: stats.suspension_score,
            earnings: stats.earnings,
        }
    }
}

impl From<&SatelliteLink> for SatelliteBody {
    fn from(link: &SatelliteLink) -> Self {
        Self {
            id: link.id.clone(),
            url: link.url.clone(),
            disqualified: link.disqualified,
            suspended: link.suspended,
        }
    }
}

impl From<RegisteredNodeDto> for RegisteredNode {
    fn from(dto: RegisteredNodeDto) -> Self {
        Self {
            node_id: dto.node_id.unwrap_or_default(),
            address: dto
                .address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| CONTAINER_HOST.to_owned()),
            dashboard_port: dto
                .dashboard_port
                .filter(|p| *p != 0)
                .unwrap_or(DEFAULT_DASHBOARD_PORT),
            id: dto.id,
        }
    }
}

impl From<IdentityDto> for AuthIdentity {
    fn from(dto: IdentityDto) -> Self {
        Self {
            email: dto.email,
            permissions: dto.permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use node_monitor_sdk::{
        Bandwidth, ContainerRef, DiskSpace, NodeEndpoint, NodeId, NodeStats, NodeStatus,
        SourceHint, StatusReport,
    };

    fn stats() -> NodeStats {
        NodeStats {
            version: "1.95.1".to_owned(),
            status: NodeStatus::Online,
            disk_space: DiskSpace::new(5_000_000_000, 1_000, 0),
            bandwidth: Bandwidth { used: 77, available: 0 },
            earnings: Some(3.2),
            audit_score: Some(1.0),
            suspension_score: Some(0.0),
            uptime: 60,
            last_contact: Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
            satellites: Vec::new(),
        }
    }

    #[test]
    fn registration_body_from_container_node() {
        let node = Node::new(
            StatusReport {
                node_id: NodeId::parse("1AbCdEfGhIjK").unwrap(),
                stats: stats(),
            },
            NodeEndpoint {
                host: "127.0.0.1".to_owned(),
                dashboard_port: 14002,
                storage_port: 28968,
            },
            SourceHint::Container(ContainerRef {
                id: "c0ffee".to_owned(),
                name: "storagenode1".to_owned(),
                image: "storjlabs/storagenode:latest".to_owned(),
                storage_port: Some(28968),
            }),
        );

        let json = serde_json::to_value(RegistrationBody::from(&node)).unwrap();
        assert_eq!(json["nodeId"], "1AbCdEfGhIjK");
        assert_eq!(json["name"], "storagenode1");
        assert_eq!(json["port"], 28968);
        assert_eq!(json["dashboardPort"], 14002);
        assert_eq!(json["status"], "ONLINE");
        assert_eq!(json["allocatedSpace"], 5_000_001_000_u64);
        assert_eq!(json["lastSeen"], "2025-03-01T12:00:00Z");
        assert_eq!(json["config"]["detectedFrom"], "docker");
        assert_eq!(json["config"]["containerId"], "c0ffee");
    }

    #[test]
    fn registered_node_defaults() {
        let node = RegisteredNode::from(RegisteredNodeDto {
            id: "42".to_owned(),
            node_id: None,
            address: Some(String::new()),
            dashboard_port: Some(0),
        });
        assert_eq!(node.address, "127.0.0.1");
        assert_eq!(node.dashboard_port, DEFAULT_DASHBOARD_PORT);
    }
}
