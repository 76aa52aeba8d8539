//! Layered configuration loading.
//!
//! Layers, lowest precedence first:
//! 1. serialized defaults of the target type
//! 2. one YAML file (explicit path, or the first existing default location)
//! 3. environment variables (named aliases plus a nested `PREFIX__A__B` form)
//! 4. command line overrides
//!
//! The result is extracted once into an immutable value owned by the caller.

pub mod duration_serde;
mod paths;

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use paths::{HomeDirError, expand_tilde};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error(transparent)]
    HomeDir(#[from] HomeDirError),
}

/// Logging section shared by every binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level directive (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Optional log file; written in addition to the console.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Write the file layer as JSON lines.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
            json: false,
        }
    }
}

/// Builder for a layered [`Figment`].
///
/// ```ignore
/// let config: AppConfig = ConfigLoader::new("STORJCLOUD")
///     .default_locations(&["~/.storjcloud/config.yaml", "./config.yaml"])
///     .env_alias("STORJCLOUD_API_TOKEN", "api.token")
///     .override_value("sync.batch_size", 20)
///     .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    prefix: String,
    explicit_file: Option<PathBuf>,
    default_locations: Vec<String>,
    env_aliases: Vec<(String, String)>,
    overrides: Vec<(String, serde_json::Value)>,
}

impl ConfigLoader {
    /// `prefix` enables nested environment keys of the form `PREFIX__SECTION__KEY`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            explicit_file: None,
            default_locations: Vec::new(),
            env_aliases: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Use exactly this file; it must exist.
    #[must_use]
    pub fn file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_file = path;
        self
    }

    /// Candidate files tried in order when no explicit file is given.
    /// `~` is expanded against the user's home directory.
    #[must_use]
    pub fn default_locations(mut self, locations: &[&str]) -> Self {
        self.default_locations = locations.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Map one environment variable onto a dotted config key.
    #[must_use]
    pub fn env_alias(mut self, var: &str, key: &str) -> Self {
        self.env_aliases.push((var.to_owned(), key.to_owned()));
        self
    }

    /// Highest-precedence value for a dotted key (command line flags).
    #[must_use]
    pub fn override_value(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.overrides.push((key.to_owned(), value.into()));
        self
    }

    /// Resolve the YAML file to read, if any.
    ///
    /// # Errors
    /// Returns [`ConfigError::FileNotFound`] when an explicit file is missing.
    pub fn resolve_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.explicit_file {
            return if path.is_file() {
                Ok(Some(path.clone()))
            } else {
                Err(ConfigError::FileNotFound(path.clone()))
            };
        }

        for raw in &self.default_locations {
            // A missing HOME only disables the home-relative candidates
            let Ok(candidate) = expand_tilde(raw) else {
                continue;
            };
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Build the merged figment using `T::default()` as the base layer.
    ///
    /// # Errors
    /// Returns an error when an explicit config file is missing.
    pub fn figment<T: Serialize + Default>(&self) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(T::default()));

        if let Some(path) = self.resolve_file()? {
            tracing::debug!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Yaml::file(path));
        }

        let aliases = self.env_aliases.clone();
        figment = figment.merge(Env::raw().filter_map(move |name| {
            aliases
                .iter()
                .find(|(var, _)| name.as_str().eq_ignore_ascii_case(var))
                .map(|(_, key)| key.clone().into())
        }));
        figment = figment.merge(Env::prefixed(&format!("{}__", self.prefix)).split("__"));

        for (key, value) in &self.overrides {
            figment = figment.merge(Serialized::default(key, value));
        }

        Ok(figment)
    }

    /// Load and extract the final configuration.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer fails to parse.
    pub fn load<T: Serialize + DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        self.figment::<T>()?
            .extract()
            .map_err(|e| ConfigError::Parse(Box::new(e)))
    }
}
