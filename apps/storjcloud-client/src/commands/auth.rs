use anyhow::Result;
use clap::Args;
use node_monitor::DashboardClient;
use node_monitor::domain::ports::DashboardApi;
use node_monitor_sdk::MonitorError;

use crate::config::AppConfig;

#[derive(Args)]
pub struct AuthArgs {}

/// Resolve the token to its account; a rejected token fails the command.
pub async fn run(config: &AppConfig) -> Result<()> {
    tracing::info!(endpoint = config.api.base_url(), "testing authentication");
    let dashboard = DashboardClient::new(&config.api)?;

    let identity = dashboard.whoami().await.map_err(MonitorError::from)?;
    tracing::info!(
        user = identity.email.as_deref().unwrap_or("unknown"),
        permissions = %identity.permissions.join(", "),
        "authentication successful"
    );
    Ok(())
}
