//! Dashboard API request and response bodies.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// `POST /storj/nodes` and the PATCH that follows a 409.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationBody {
    pub node_id: String,
    pub name: String,
    pub address: String,
    /// Storage (public) port.
    pub port: u16,
    pub dashboard_port: u16,
    pub version: String,
    pub status: &'static str,
    pub allocated_space: u64,
    pub used_space: u64,
    pub available_space: u64,
    pub bandwidth_used: u64,
    pub uptime: u64,
    pub last_seen: Option<String>,
    pub config: SourceConfigBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfigBody {
    pub detected_from: &'static str,
    pub container_id: Option<String>,
    pub container_name: Option<String>,
    pub image: Option<String>,
}

/// `PATCH /storj/nodes/{id}` metrics ingest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBody {
    pub status: &'static str,
    pub version: String,
    pub used_space: u64,
    pub available_space: u64,
    pub bandwidth_used: u64,
    pub uptime: u64,
    pub last_seen: String,
    pub reputation: ReputationBody,
    pub satellites: Vec<SatelliteBody>,
    pub audit_score: Option<f64>,
    pub suspension_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationBody {
    pub audit_score: Option<f64>,
    pub suspension_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SatelliteBody {
    pub id: String,
    pub url: String,
    pub disqualified: bool,
    pub suspended: bool,
}

/// `GET /storj/nodes`. Older dashboards return a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NodeListResponse {
    Wrapped {
        #[serde(default)]
        nodes: Vec<RegisteredNodeDto>,
    },
    Bare(Vec<RegisteredNodeDto>),
}

impl NodeListResponse {
    pub fn into_nodes(self) -> Vec<RegisteredNodeDto> {
        match self {
            Self::Wrapped { nodes } | Self::Bare(nodes) => nodes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredNodeDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub dashboard_port: Option<u16>,
}

/// `GET /auth/me`
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityDto {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Record ids are strings on current dashboards and integers on old ones.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct Id;

    impl Visitor<'_> for Id {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(Id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accepts_both_shapes() {
        let wrapped: NodeListResponse =
            serde_json::from_str(r#"{"nodes":[{"id":7,"nodeId":"abc"}]}"#).unwrap();
        let bare: NodeListResponse =
            serde_json::from_str(r#"[{"id":"n-1","address":"10.0.0.5","dashboardPort":14003}]"#)
                .unwrap();

        let wrapped = wrapped.into_nodes();
        assert_eq!(wrapped[0].id, "7");
        assert_eq!(wrapped[0].address, None);

        let bare = bare.into_nodes();
        assert_eq!(bare[0].dashboard_port, Some(14003));
    }

    #[test]
    fn earnings_omitted_when_unknown() {
        let body = MetricsBody {
            status: "ONLINE",
            version: "1.95.1".to_owned(),
            used_space: 1,
            available_space: 2,
            bandwidth_used: 3,
            uptime: 4,
            last_seen: "2025-01-01T00:00:00Z".to_owned(),
            reputation: ReputationBody {
                audit_score: Some(1.0),
                suspension_score: None,
            },
            satellites: Vec::new(),
            audit_score: Some(1.0),
            suspension_score: None,
            earnings: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("earnings").is_none());
        assert_eq!(json["usedSpace"], 1);
        assert_eq!(json["reputation"]["auditScore"], 1.0);
    }
}
