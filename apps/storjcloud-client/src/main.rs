mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::commands::{AuthArgs, ConfigArgs, DiscoverArgs, SyncArgs};
use crate::config::{AppConfig, GlobalArgs};

/// Storj Cloud client - storage node discovery and dashboard sync
#[derive(Parser)]
#[command(name = "storjcloud-client")]
#[command(about = "Storj Cloud client - storage node discovery and dashboard sync")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find storage nodes and register them with the dashboard
    Discover(DiscoverArgs),
    /// Poll registered nodes and push their metrics until interrupted
    Sync(SyncArgs),
    /// Check the API token against the dashboard
    Auth(AuthArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

impl Commands {
    fn overrides(&self) -> Vec<(&'static str, serde_json::Value)> {
        match self {
            Self::Discover(args) => args.overrides(),
            Self::Sync(args) => args.overrides(),
            Self::Auth(_) | Self::Config(_) => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.global, cli.command.overrides())?;
    sc_bootstrap::init_logging(&config.logging).context("failed to initialize logging")?;

    match cli.command {
        Commands::Discover(args) => args.run(&config).await,
        Commands::Sync(_) => commands::sync::run(config).await,
        Commands::Auth(_) => commands::auth::run(&config).await,
        Commands::Config(args) => args.run(&config),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serde_json::Value;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "storjcloud-client",
            "sync",
            "-i",
            "2m",
            "--batch-size",
            "20",
            "--retry-failed",
            "false",
        ])
        .unwrap();

        assert_eq!(
            cli.command.overrides(),
            vec![
                ("sync.interval", Value::from("2m")),
                ("sync.batch_size", Value::from(20)),
                ("sync.retry_failed", Value::from(false)),
            ]
        );
    }

    #[test]
    fn discover_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "storjcloud-client",
            "discover",
            "--from-docker",
            "--docker-host",
            "tcp://10.0.0.2:2375",
            "--timeout",
            "3",
            "-p",
            "14002,14003",
        ])
        .unwrap();

        assert_eq!(
            cli.command.overrides(),
            vec![
                ("discovery.from_docker", Value::from(true)),
                ("discovery.docker_host", Value::from("tcp://10.0.0.2:2375")),
                ("discovery.timeout", Value::from("3")),
            ]
        );
    }

    #[test]
    fn ports_and_range_are_exclusive() {
        let result = Cli::try_parse_from([
            "storjcloud-client",
            "discover",
            "-p",
            "14000",
            "--port-range",
            "14000-14002",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "storjcloud-client",
            "auth",
            "--token",
            "abc",
            "--url",
            "https://x.test/api/v1",
        ])
        .unwrap();
        assert_eq!(cli.global.token.as_deref(), Some("abc"));
        assert_eq!(cli.global.url.as_deref(), Some("https://x.test/api/v1"));
        assert!(cli.command.overrides().is_empty());
    }
}
