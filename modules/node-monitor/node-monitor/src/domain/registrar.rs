use std::sync::Arc;

use node_monitor_sdk::{MonitorError, Node, RegistrationResult, RegistrationSummary};

use super::error::DashboardError;
use super::ports::{CreateOutcome, DashboardApi};

/// Registers confirmed nodes with the dashboard, one request per node.
pub struct Registrar {
    dashboard: Arc<dyn DashboardApi>,
}

impl Registrar {
    pub fn new(dashboard: Arc<dyn DashboardApi>) -> Self {
        Self { dashboard }
    }

    /// Register every node. Already-registered nodes are updated in place.
    ///
    /// # Errors
    /// Returns [`MonitorError::Authentication`] as soon as the dashboard
    /// rejects the token; remaining nodes are not attempted. Every other
    /// failure is recorded on that node's result.
    pub async fn register(&self, nodes: Vec<Node>) -> Result<RegistrationSummary, MonitorError> {
        let mut results = Vec::with_capacity(nodes.len());

        for node in nodes {
            match self.register_one(&node).await {
                Ok(CreateOutcome::Created) => {
                    tracing::info!(node_id = %node.node_id().short(), name = %node.name(), "registered node");
                    results.push(RegistrationResult::accepted(node, None));
                }
                Ok(CreateOutcome::Conflict) => {
                    tracing::info!(node_id = %node.node_id().short(), "updated existing node");
                    results.push(RegistrationResult::accepted(node, Some("updated".to_owned())));
                }
                Err(err) if err.is_auth() => {
                    tracing::error!("authentication failed - check API token");
                    return Err(err.into());
                }
                Err(err) => {
                    tracing::warn!(
                        node_id = %node.node_id().short(),
                        error = %err,
                        "node registration failed"
                    );
                    results.push(RegistrationResult::rejected(node, err.to_string()));
                }
            }
        }

        let summary = RegistrationSummary::from_results(results);
        tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected(),
            "registration finished"
        );
        Ok(summary)
    }

    async fn register_one(&self, node: &Node) -> Result<CreateOutcome, DashboardError> {
        match self.dashboard.create_node(node).await? {
            CreateOutcome::Created => Ok(CreateOutcome::Created),
            CreateOutcome::Conflict => {
                tracing::debug!(node_id = %node.node_id().short(), "node already exists, updating");
                self.dashboard.update_node(node).await?;
                Ok(CreateOutcome::Conflict)
            }
        }
    }
}
