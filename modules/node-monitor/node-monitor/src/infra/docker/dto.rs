//! Docker Engine API bodies (only the fields discovery reads).

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::ports::{ContainerDetails, ContainerSummary, PortBinding};

/// Item of `GET /containers/json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummaryDto {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
}

/// `GET /containers/{id}/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspectDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ContainerConfigDto,
    #[serde(default)]
    pub network_settings: NetworkSettingsDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfigDto {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub env: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettingsDto {
    /// `"14002/tcp" -> [bindings]`; exposed but unpublished ports map to null.
    #[serde(default)]
    pub ports: Option<HashMap<String, Option<Vec<HostBindingDto>>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostBindingDto {
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
}

impl From<ContainerSummaryDto> for ContainerSummary {
    fn from(dto: ContainerSummaryDto) -> Self {
        Self {
            id: dto.id,
            names: dto.names,
            image: dto.image,
        }
    }
}

impl From<ContainerInspectDto> for ContainerDetails {
    fn from(dto: ContainerInspectDto) -> Self {
        let mut ports: Vec<PortBinding> = dto
            .network_settings
            .ports
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, bindings)| Some((parse_port_key(&key)?, bindings?)))
            .flat_map(|((container_port, protocol), bindings)| {
                bindings.into_iter().filter_map(move |b| {
                    Some(PortBinding {
                        container_port,
                        protocol: protocol.clone(),
                        host_port: b.host_port.parse().ok()?,
                    })
                })
            })
            .collect();
        // IPv4 and IPv6 listeners publish the same port twice
        ports.sort_by(|a, b| {
            (a.container_port, &a.protocol, a.host_port).cmp(&(b.container_port, &b.protocol, b.host_port))
        });
        ports.dedup();

        Self {
            id: dto.id,
            name: dto.name,
            image: dto.config.image,
            env: dto.config.env.unwrap_or_default(),
            ports,
        }
    }
}

/// `"14002/tcp"` to `(14002, "tcp")`. A missing protocol means tcp.
fn parse_port_key(key: &str) -> Option<(u16, String)> {
    let (port, protocol) = key.split_once('/').unwrap_or((key, "tcp"));
    Some((port.parse().ok()?, protocol.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_maps_published_ports() {
        let dto: ContainerInspectDto = serde_json::from_str(
            r#"{
                "Id": "f00d",
                "Name": "/storagenode",
                "Config": {
                    "Image": "storjlabs/storagenode:latest",
                    "Env": ["ADDRESS=node.example.com:28967", "STORAGE=2TB"]
                },
                "NetworkSettings": {
                    "Ports": {
                        "14002/tcp": [
                            {"HostIp": "0.0.0.0", "HostPort": "14002"},
                            {"HostIp": "::", "HostPort": "14002"}
                        ],
                        "28967/udp": [{"HostIp": "0.0.0.0", "HostPort": "28967"}],
                        "7777/tcp": null
                    }
                }
            }"#,
        )
        .unwrap();
        let details = ContainerDetails::from(dto);

        assert_eq!(details.name, "/storagenode");
        assert_eq!(details.ports.len(), 2);
        assert_eq!(details.tcp_binding(14002), Some(14002));
        assert_eq!(details.tcp_binding(28967), None);
        assert_eq!(details.env_var("STORAGE"), Some("2TB"));
    }

    #[test]
    fn null_env_and_ports() {
        let dto: ContainerInspectDto = serde_json::from_str(
            r#"{"Id":"x","Config":{"Env":null},"NetworkSettings":{"Ports":null}}"#,
        )
        .unwrap();
        let details = ContainerDetails::from(dto);
        assert!(details.env.is_empty());
        assert!(details.ports.is_empty());
    }
}
