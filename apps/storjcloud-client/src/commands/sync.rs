use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use node_monitor::{DashboardClient, StatusApiClient, SyncEngine};
use serde_json::Value;

use crate::config::AppConfig;

#[derive(Args)]
pub struct SyncArgs {
    /// Time between sync ticks (`300`, `5m`, `1h`)
    #[arg(short, long, value_name = "DURATION")]
    interval: Option<String>,

    /// Nodes polled per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Retry failed nodes within a tick
    #[arg(long, value_name = "BOOL")]
    retry_failed: Option<bool>,
}

impl SyncArgs {
    pub fn overrides(&self) -> Vec<(&'static str, Value)> {
        let mut overrides = Vec::new();
        if let Some(interval) = &self.interval {
            overrides.push(("sync.interval", Value::from(interval.as_str())));
        }
        if let Some(batch_size) = self.batch_size {
            overrides.push(("sync.batch_size", Value::from(batch_size)));
        }
        if let Some(retry_failed) = self.retry_failed {
            overrides.push(("sync.retry_failed", Value::from(retry_failed)));
        }
        overrides
    }
}

/// Tick until a shutdown signal arrives or a fatal error stops the engine.
pub async fn run(config: AppConfig) -> Result<()> {
    let dashboard = DashboardClient::new(&config.api)?;
    let status = StatusApiClient::new(config.sync.poll_timeout)
        .context("failed to build node status client")?;

    tracing::info!(
        endpoint = config.api.base_url(),
        interval_secs = config.sync.interval.as_secs(),
        batch_size = config.sync.batch_size,
        retry_failed = config.sync.retry_failed,
        "starting sync"
    );

    let engine = SyncEngine::new(Arc::new(dashboard), Arc::new(status), config.sync);
    engine.run(sc_bootstrap::shutdown_token()).await?;
    Ok(())
}
