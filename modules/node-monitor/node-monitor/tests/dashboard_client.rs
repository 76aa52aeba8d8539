#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Dashboard client wire behavior

mod common;

use chrono::{TimeZone, Utc};
use common::{TOKEN, api_config, stats};
use httpmock::prelude::*;
use node_monitor::DashboardClient;
use node_monitor::domain::error::DashboardError;
use node_monitor::domain::ports::DashboardApi;
use node_monitor_sdk::MetricsSnapshot;
use serde_json::json;

fn client(server: &MockServer) -> DashboardClient {
    DashboardClient::new(&api_config(server)).unwrap()
}

#[tokio::test]
async fn whoami_reads_identity() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/auth/me")
            .header("authorization", format!("Bearer {TOKEN}"));
        then.status(200)
            .json_body(json!({"email": "ops@example.com", "permissions": ["nodes:write"]}));
    });

    let identity = client(&server).whoami().await.unwrap();
    assert_eq!(identity.email.as_deref(), Some("ops@example.com"));
    assert_eq!(identity.permissions, vec!["nodes:write"]);
}

#[tokio::test]
async fn list_applies_defaults() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/storj/nodes");
        then.status(200).json_body(json!({
            "nodes": [
                {"id": "a1", "nodeId": "1Alpha", "address": "10.0.0.7", "dashboardPort": 14003},
                {"id": 12, "nodeId": "1Beta"}
            ]
        }));
    });

    let nodes = client(&server).list_nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].address, "10.0.0.7");
    assert_eq!(nodes[0].dashboard_port, 14003);
    assert_eq!(nodes[1].id, "12");
    assert_eq!(nodes[1].address, "127.0.0.1");
    assert_eq!(nodes[1].dashboard_port, 14002);
}

#[tokio::test]
async fn push_sends_metrics_to_record_id() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/api/v1/storj/nodes/rec-9")
            .json_body_includes(
                r#"{"status": "ONLINE", "usedSpace": 5000000000, "lastSeen": "2025-06-01T08:30:00Z", "reputation": {"auditScore": 1.0}}"#,
            );
        then.status(200);
    });

    let snapshot = MetricsSnapshot {
        node_id: "rec-9".to_owned(),
        metrics: stats(5_000_000_000),
        collected_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap(),
    };
    client(&server).push_metrics(&snapshot).await.unwrap();
    patch.assert();
}

#[tokio::test]
async fn status_errors_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/auth/me");
        then.status(403);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/storj/nodes");
        then.status(503).body("  maintenance  ");
    });

    let client = client(&server);
    assert_eq!(
        client.whoami().await.unwrap_err(),
        DashboardError::Unauthorized { status: 403 }
    );
    assert_eq!(
        client.list_nodes().await.unwrap_err(),
        DashboardError::Status {
            status: 503,
            body: "maintenance".to_owned()
        }
    );
}

#[tokio::test]
async fn malformed_list_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/storj/nodes");
        then.status(200).body("<html>login</html>");
    });

    let err = client(&server).list_nodes().await.unwrap_err();
    assert!(matches!(err, DashboardError::Malformed(_)));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let mut config = api_config(&MockServer::start());
    config.endpoint = format!("http://127.0.0.1:{}/api/v1", common::dead_port());

    let err = DashboardClient::new(&config)
        .unwrap()
        .list_nodes()
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}
