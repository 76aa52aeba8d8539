//! Status DTO to domain model.

use chrono::{DateTime, Utc};
use node_monitor_sdk::{
    Bandwidth, DiskSpace, NodeId, NodeStats, NodeStatus, SatelliteLink, StatusReport,
};

use super::dto::{SatelliteDto, StatusDto};
use crate::domain::error::StatusFetchError;

impl TryFrom<StatusDto> for StatusReport {
    type Error = StatusFetchError;

    fn try_from(dto: StatusDto) -> Result<Self, Self::Error> {
        let node_id = NodeId::parse(&dto.node_id)
            .ok_or_else(|| StatusFetchError::Malformed("empty nodeID".to_owned()))?;

        let contact = dto
            .last_contact_success
            .as_deref()
            .or(dto.last_pinged.as_deref())
            .and_then(contact_time);
        let reputation = dto.reputation.unwrap_or_default();
        let status = NodeStatus::derive(
            contact.is_some(),
            dto.disqualified,
            reputation.audit_score,
            reputation.suspension_score,
        );

        Ok(StatusReport {
            node_id,
            stats: NodeStats {
                version: dto.version.unwrap_or_default(),
                status,
                disk_space: DiskSpace::new(
                    dto.disk_space.used,
                    dto.disk_space.available,
                    dto.disk_space.trash,
                ),
                bandwidth: Bandwidth {
                    used: dto.bandwidth.used,
                    available: dto.bandwidth.available,
                },
                earnings: dto.earnings,
                audit_score: reputation.audit_score,
                suspension_score: reputation.suspension_score,
                uptime: dto.uptime,
                last_contact: contact,
                satellites: dto
                    .satellites
                    .unwrap_or_default()
                    .into_iter()
                    .map(SatelliteLink::from)
                    .collect(),
            },
        })
    }
}

impl From<SatelliteDto> for SatelliteLink {
    fn from(dto: SatelliteDto) -> Self {
        Self {
            id: dto.id,
            url: dto.url,
            disqualified: dto.disqualified,
            suspended: dto.suspended,
        }
    }
}

/// Parse a last-contact timestamp. Nodes that never reached a satellite
/// report the zero time (`0001-01-01T00:00:00Z`), which counts as no contact.
fn contact_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .filter(|t| *t > DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(json: &str) -> Result<StatusReport, StatusFetchError> {
        serde_json::from_str::<StatusDto>(json).unwrap().try_into()
    }

    #[test]
    fn healthy_node() {
        let report = report(
            r#"{
                "nodeID": "12YzwQ9bN7F1",
                "version": "1.95.1",
                "diskSpace": {"used": 100, "available": 900, "trash": 5},
                "bandwidth": {"used": 42},
                "lastPinged": "2025-01-01T10:00:00Z",
                "reputation": {"auditScore": 1.0, "suspensionScore": 0.0},
                "uptime": 3600
            }"#,
        )
        .unwrap();
        assert_eq!(report.node_id.as_str(), "12YzwQ9bN7F1");
        assert_eq!(report.stats.status, NodeStatus::Online);
        assert_eq!(report.stats.disk_space.total, 1000);
        assert_eq!(report.stats.bandwidth.used, 42);
        assert!(report.stats.last_contact.is_some());
    }

    #[test]
    fn trash_is_not_part_of_total() {
        let report = report(
            r#"{"nodeID":"n","diskSpace":{"used":300,"available":700,"trash":250}}"#,
        )
        .unwrap();
        let disk = report.stats.disk_space;
        assert_eq!(disk.trash, 250);
        assert_eq!(disk.total, 1000);
    }

    #[test]
    fn zero_time_is_offline() {
        let report = report(
            r#"{"nodeID":"n","lastContactSuccess":"0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(report.stats.status, NodeStatus::Offline);
        assert_eq!(report.stats.last_contact, None);
    }

    #[test]
    fn low_audit_is_warning() {
        let report = report(
            r#"{"nodeID":"n","lastContactSuccess":"2025-01-01T10:00:00Z","reputation":{"auditScore":0.9}}"#,
        )
        .unwrap();
        assert_eq!(report.stats.status, NodeStatus::Warning);
    }

    #[test]
    fn blank_node_id_rejected() {
        assert!(matches!(
            report(r#"{"nodeID":"  "}"#),
            Err(StatusFetchError::Malformed(_))
        ));
    }
}
