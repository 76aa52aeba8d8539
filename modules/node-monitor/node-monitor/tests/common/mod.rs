#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures for node-monitor integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use httpmock::prelude::*;
use node_monitor::config::ApiConfig;
use node_monitor_sdk::{
    Bandwidth, DiskSpace, Node, NodeEndpoint, NodeId, NodeStats, NodeStatus, RegisteredNode,
    SourceHint, StatusReport,
};
use sc_bootstrap::ApiToken;
use serde_json::{Value, json};

pub const TOKEN: &str = "sk-integration";

/// A `/api/sno` body for a healthy node.
pub fn status_body(node_id: &str, used: Value) -> Value {
    json!({
        "nodeID": node_id,
        "version": "1.95.1",
        "diskSpace": {"used": used, "available": 2_000_000_000_u64, "trash": 0},
        "bandwidth": {"used": 1_234, "available": 0},
        "lastPinged": "2025-06-01T12:00:00Z",
        "reputation": {"auditScore": 1.0, "suspensionScore": 0.0},
        "satellites": [{"id": "sat-1", "url": "us1.storj.io:7777", "disqualified": null, "suspended": null}],
        "uptime": 86_400
    })
}

/// Mock storage node serving `/api/sno`.
pub fn node_server(node_id: &str, used: Value) -> MockServer {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sno");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(status_body(node_id, used));
    });
    server
}

/// A loopback port with nothing listening on it.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// A loopback port that accepts connections and never answers them.
/// Returns the port and a counter of accepted connections.
pub async fn stalled_port() -> (u16, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });
    (port, accepted)
}

/// API settings pointing at a mock dashboard.
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        token: Some(ApiToken::new(TOKEN)),
        endpoint: server.url("/api/v1"),
        timeout: Duration::from_secs(5),
        allow_insecure_http: true,
    }
}

pub fn stats(used: u64) -> NodeStats {
    NodeStats {
        version: "1.95.1".to_owned(),
        status: NodeStatus::Online,
        disk_space: DiskSpace::new(used, 1_000, 0),
        bandwidth: Bandwidth::default(),
        earnings: None,
        audit_score: Some(1.0),
        suspension_score: Some(0.0),
        uptime: 60,
        last_contact: None,
        satellites: Vec::new(),
    }
}

pub fn confirmed_node(node_id: &str, port: u16) -> Node {
    Node::new(
        StatusReport {
            node_id: NodeId::parse(node_id).unwrap(),
            stats: stats(500),
        },
        NodeEndpoint {
            host: "127.0.0.1".to_owned(),
            dashboard_port: port,
            storage_port: 28967,
        },
        SourceHint::ExplicitPort,
    )
}

pub fn registered(id: &str, port: u16) -> RegisteredNode {
    RegisteredNode {
        id: id.to_owned(),
        node_id: format!("node-{id}"),
        address: "127.0.0.1".to_owned(),
        dashboard_port: port,
    }
}
