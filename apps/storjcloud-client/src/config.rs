//! Application configuration: defaults, YAML file, environment, flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use node_monitor::config::{ApiConfig, DiscoveryConfig, SyncConfig};
use node_monitor_sdk::MonitorError;
use sc_bootstrap::{ConfigLoader, LoggingConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ENV_PREFIX: &str = "STORJCLOUD";

const DEFAULT_LOCATIONS: [&str; 3] = [
    "~/.storjcloud/config.yaml",
    "/etc/storjcloud/config.yaml",
    "./config.yaml",
];

const ENV_ALIASES: [(&str, &str); 8] = [
    ("STORJCLOUD_API_TOKEN", "api.token"),
    ("STORJCLOUD_DASHBOARD_URL", "api.endpoint"),
    ("STORJCLOUD_API_TIMEOUT", "api.timeout"),
    ("DOCKER_HOST", "discovery.docker_host"),
    ("STORJCLOUD_FROM_DOCKER", "discovery.from_docker"),
    ("STORJCLOUD_SYNC_INTERVAL", "sync.interval"),
    ("STORJCLOUD_LOG_LEVEL", "logging.level"),
    ("STORJCLOUD_LOG_FILE", "logging.file"),
];

/// Options accepted by every command.
#[derive(Args, Default)]
pub struct GlobalArgs {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// API token from the Storj Cloud dashboard
    #[arg(short, long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Dashboard API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub discovery: DiscoveryConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Merge every layer, then validate.
    ///
    /// `overrides` are command-specific flags as dotted keys; they win over
    /// everything else, global flags included.
    ///
    /// # Errors
    /// Fails when an explicit file is missing, a layer does not parse or the
    /// merged result is invalid.
    pub fn load(global: &GlobalArgs, overrides: Vec<(&'static str, Value)>) -> Result<Self> {
        let mut loader = ConfigLoader::new(ENV_PREFIX)
            .file(global.config.clone())
            .default_locations(&DEFAULT_LOCATIONS);
        for (var, key) in ENV_ALIASES {
            loader = loader.env_alias(var, key);
        }

        let flags = [
            ("api.token", global.token.as_deref()),
            ("api.endpoint", global.url.as_deref()),
            ("logging.level", global.log_level.as_deref()),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                loader = loader.override_value(key, value);
            }
        }
        for (key, value) in overrides {
            loader = loader.override_value(key, value);
        }

        let config: Self = loader.load().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns the first invalid section as [`MonitorError::Configuration`].
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.api.validate()?;
        self.discovery.validate()?;
        self.sync.validate()
    }

    /// Serializable view with the token replaced by a placeholder.
    ///
    /// # Errors
    /// Propagates serialization failures.
    pub fn redacted(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(api) = value.get_mut("api").and_then(Value::as_object_mut) {
            let token = match &self.api.token {
                Some(token) if !token.is_blank() => Value::from(token.to_string()),
                _ => Value::Null,
            };
            api.insert("token".to_owned(), token);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn with_clean_env<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let mut all: Vec<(&str, Option<&str>)> = ENV_ALIASES
            .iter()
            .filter(|(var, _)| !vars.iter().any(|(set, _)| set == var))
            .map(|(var, _)| (*var, None))
            .collect();
        all.extend_from_slice(vars);
        temp_env::with_vars(all, f)
    }

    #[test]
    fn file_env_and_flags_layer_in_order() {
        let (_dir, path) = write_config(
            r"
api:
  endpoint: https://file.example.com/api/v1
sync:
  interval: 10m
  batch_size: 5
logging:
  level: warn
",
        );

        let config = with_clean_env(
            &[
                ("STORJCLOUD_API_TOKEN", Some("env-token")),
                ("STORJCLOUD_SYNC_INTERVAL", Some("120")),
            ],
            || {
                let global = GlobalArgs {
                    config: Some(path.clone()),
                    log_level: Some("debug".to_owned()),
                    ..GlobalArgs::default()
                };
                AppConfig::load(&global, vec![("sync.batch_size", Value::from(25))]).unwrap()
            },
        );

        assert_eq!(config.api.endpoint, "https://file.example.com/api/v1");
        assert_eq!(config.api.token.as_ref().unwrap().expose(), "env-token");
        assert_eq!(config.sync.interval, Duration::from_secs(120));
        assert_eq!(config.sync.batch_size, 25);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn token_flag_beats_environment() {
        let config = with_clean_env(&[("STORJCLOUD_API_TOKEN", Some("env-token"))], || {
            let global = GlobalArgs {
                token: Some("flag-token".to_owned()),
                ..GlobalArgs::default()
            };
            AppConfig::load(&global, Vec::new()).unwrap()
        });
        assert_eq!(config.api.token.as_ref().unwrap().expose(), "flag-token");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let (_dir, path) = write_config("sync:\n  batchsize: 5\n");
        let err = with_clean_env(&[], || {
            let global = GlobalArgs {
                config: Some(path.clone()),
                ..GlobalArgs::default()
            };
            AppConfig::load(&global, Vec::new()).unwrap_err()
        });
        assert!(format!("{err:#}").contains("batchsize"), "{err:#}");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = with_clean_env(&[], || {
            AppConfig::load(
                &GlobalArgs::default(),
                vec![("sync.batch_size", Value::from(0))],
            )
            .unwrap_err()
        });
        assert!(err.to_string().contains("sync.batch_size"), "{err}");
    }

    #[test]
    fn redacted_view_hides_token() {
        let config = with_clean_env(&[], || {
            let global = GlobalArgs {
                token: Some("sk-secret-value".to_owned()),
                ..GlobalArgs::default()
            };
            AppConfig::load(&global, Vec::new()).unwrap()
        });

        let view = config.redacted().unwrap();
        assert_eq!(view["api"]["token"], "[REDACTED]");
        assert!(!view.to_string().contains("sk-secret-value"));
        assert_eq!(view["sync"]["interval"], "5m");

        let empty = AppConfig::default().redacted().unwrap();
        assert!(empty["api"]["token"].is_null());
    }
}
