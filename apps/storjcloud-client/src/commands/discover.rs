use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use node_monitor::domain::candidates::{ContainerSource, ExplicitPorts, PortRange};
use node_monitor::{
    CandidateSource, DashboardClient, DiscoveryEngine, DockerClient, Node, PortValidator,
    Registrar, StatusApiClient,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;

const LOOPBACK: &str = "127.0.0.1";

#[derive(Args)]
pub struct DiscoverArgs {
    /// Also look for storage node containers through Docker
    #[arg(long)]
    from_docker: bool,

    /// Docker daemon address (`unix:///var/run/docker.sock`, `tcp://host:2375`)
    #[arg(long, value_name = "HOST")]
    docker_host: Option<String>,

    /// Address the node dashboards listen on [default: detected local IP]
    #[arg(short, long, value_name = "IP")]
    server: Option<String>,

    /// Dashboard ports to probe, comma separated
    #[arg(short, long, value_delimiter = ',', value_name = "PORTS")]
    ports: Vec<u16>,

    /// Inclusive port range to probe, e.g. `14000-14010`
    #[arg(long, value_name = "START-END", conflicts_with = "ports")]
    port_range: Option<String>,

    /// Per-probe timeout (`5`, `5s`, `500ms`)
    #[arg(long, value_name = "DURATION")]
    timeout: Option<String>,

    /// Print discovered nodes as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Skip registration with the dashboard
    #[arg(long)]
    no_register: bool,
}

impl DiscoverArgs {
    pub fn overrides(&self) -> Vec<(&'static str, Value)> {
        let mut overrides = Vec::new();
        if self.from_docker {
            overrides.push(("discovery.from_docker", Value::from(true)));
        }
        if let Some(host) = &self.docker_host {
            overrides.push(("discovery.docker_host", Value::from(host.as_str())));
        }
        if let Some(timeout) = &self.timeout {
            overrides.push(("discovery.timeout", Value::from(timeout.as_str())));
        }
        overrides
    }

    pub async fn run(&self, config: &AppConfig) -> Result<()> {
        // Token problems surface before any probe goes out
        let registrar = if self.no_register {
            None
        } else {
            Some(Registrar::new(Arc::new(DashboardClient::new(&config.api)?)))
        };

        let host = self.server.clone().unwrap_or_else(detect_host);
        let sources = self.sources(config)?;
        let discovery = &config.discovery;
        let status = StatusApiClient::new(discovery.timeout)
            .context("failed to build node status client")?;
        let engine = DiscoveryEngine::new(
            Arc::new(PortValidator::new(Arc::new(status), discovery.retry_attempts)),
            discovery.timeout,
        );

        tracing::info!(host = %host, "starting node discovery");
        let report = engine
            .discover(&host, &sources, discovery.concurrency)
            .await?;
        tracing::info!(
            found = report.nodes.len(),
            rejected = report.rejections.len(),
            unreachable = report.unreachable(),
            "discovery finished"
        );

        if self.json {
            let rows: Vec<NodeRow<'_>> = report.nodes.iter().map(NodeRow::from).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            report.nodes.iter().for_each(log_node);
        }

        if report.nodes.is_empty() {
            tracing::warn!("no nodes discovered");
            return Ok(());
        }
        let Some(registrar) = registrar else {
            return Ok(());
        };

        let total = report.nodes.len();
        let summary = registrar.register(report.nodes).await?;
        for result in &summary.results {
            if let Some(error) = &result.error {
                tracing::warn!(error = %error, "node not registered");
            }
        }
        tracing::info!(
            registered = summary.accepted,
            total,
            "nodes registered with the dashboard"
        );
        Ok(())
    }

    /// Port candidates come from `--port-range`, `--ports` or the configured
    /// common ports, in that order of preference. Docker is added on top.
    fn sources(&self, config: &AppConfig) -> Result<Vec<Arc<dyn CandidateSource>>> {
        let discovery = &config.discovery;
        let mut sources: Vec<Arc<dyn CandidateSource>> = Vec::new();

        if discovery.from_docker {
            match DockerClient::from_host(&discovery.docker_host, discovery.timeout) {
                Ok(client) => sources.push(Arc::new(ContainerSource::new(Arc::new(client)))),
                Err(e) => tracing::warn!(error = %e, "docker discovery disabled"),
            }
        }

        let ports: Arc<dyn CandidateSource> = if let Some(range) = &self.port_range {
            Arc::new(PortRange::parse(range)?)
        } else if self.ports.is_empty() {
            Arc::new(ExplicitPorts::new(discovery.common_ports.clone()))
        } else {
            Arc::new(ExplicitPorts::new(self.ports.clone()))
        };
        sources.push(ports);
        Ok(sources)
    }
}

fn detect_host() -> String {
    match local_ip_address::local_ip() {
        Ok(ip) => {
            tracing::debug!(ip = %ip, "detected local IP address");
            ip.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to detect local IP address, using {LOOPBACK}");
            LOOPBACK.to_owned()
        }
    }
}

fn log_node(node: &Node) {
    tracing::info!(
        node_id = %node.node_id().short(),
        host = %node.endpoint.host,
        port = node.endpoint.dashboard_port,
        status = %node.stats.status,
        version = %node.stats.version,
        used_gb = %gigabytes(node.stats.disk_space.used),
        "node discovered"
    );
}

/// Decimal gigabytes with two digits, truncated.
fn gigabytes(bytes: u64) -> String {
    let hundredths = bytes / 10_000_000;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeRow<'a> {
    #[serde(rename = "nodeID")]
    node_id: &'a str,
    name: String,
    dashboard_host: &'a str,
    dashboard_port: u16,
    storage_port: u16,
    status: &'static str,
    version: &'a str,
    disk_space: DiskRow,
    detected_from: &'static str,
}

#[derive(Serialize)]
struct DiskRow {
    used: u64,
    available: u64,
    trash: u64,
    total: u64,
}

impl<'a> From<&'a Node> for NodeRow<'a> {
    fn from(node: &'a Node) -> Self {
        let disk = node.stats.disk_space;
        Self {
            node_id: node.node_id().as_str(),
            name: node.name(),
            dashboard_host: &node.endpoint.host,
            dashboard_port: node.endpoint.dashboard_port,
            storage_port: node.endpoint.storage_port,
            status: node.stats.status.as_str(),
            version: &node.stats.version,
            disk_space: DiskRow {
                used: disk.used,
                available: disk.available,
                trash: disk.trash,
                total: disk.total,
            },
            detected_from: node.origin.detected_from(),
        }
    }
}

#[cfg(test)]
mod tests {
    use node_monitor_sdk::{
        Bandwidth, DiskSpace, NodeEndpoint, NodeId, NodeStats, NodeStatus, SourceHint,
        StatusReport,
    };
    use tracing_test::traced_test;

    use super::*;

    fn node() -> Node {
        let report = StatusReport {
            node_id: NodeId::parse("12xAbCdEfGhIjKlMn").unwrap(),
            stats: NodeStats {
                version: "1.95.1".to_owned(),
                status: NodeStatus::Online,
                disk_space: DiskSpace::new(5_126_000_000, 1_000_000_000, 0),
                bandwidth: Bandwidth::default(),
                earnings: None,
                audit_score: Some(1.0),
                suspension_score: None,
                uptime: 3600,
                last_contact: None,
                satellites: Vec::new(),
            },
        };
        let endpoint = NodeEndpoint {
            host: "192.168.1.20".to_owned(),
            dashboard_port: 14002,
            storage_port: 28967,
        };
        Node::new(report, endpoint, SourceHint::ExplicitPort)
    }

    #[test]
    fn gigabytes_truncate_to_two_digits() {
        assert_eq!(gigabytes(0), "0.00");
        assert_eq!(gigabytes(5_126_999_999), "5.12");
        assert_eq!(gigabytes(12_000_000_000_000), "12000.00");
    }

    #[test]
    #[traced_test]
    fn discovered_node_is_logged_with_fields() {
        log_node(&node());
        assert!(logs_contain("node discovered"));
        assert!(logs_contain("node_id=12xAbCdE"));
        assert!(logs_contain("host=192.168.1.20"));
        assert!(logs_contain("port=14002"));
        assert!(logs_contain("status=ONLINE"));
        assert!(logs_contain("version=1.95.1"));
        assert!(logs_contain("used_gb=5.12"));
    }

    #[test]
    fn json_row_shape() {
        let node = node();
        let value = serde_json::to_value(NodeRow::from(&node)).unwrap();
        assert_eq!(value["nodeID"], "12xAbCdEfGhIjKlMn");
        assert_eq!(value["name"], "Node-14002");
        assert_eq!(value["dashboardHost"], "192.168.1.20");
        assert_eq!(value["dashboardPort"], 14002);
        assert_eq!(value["status"], "ONLINE");
        assert_eq!(value["diskSpace"]["used"], 5_126_000_000_u64);
        assert_eq!(value["diskSpace"]["total"], 6_126_000_000_u64);
        assert_eq!(value["detectedFrom"], "port_scan");
    }
}
