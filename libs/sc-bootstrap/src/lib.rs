#![forbid(unsafe_code)]

//! Process bootstrap for the Storj Cloud client.
//!
//! This crate provides configuration layering, logging initialization,
//! signal handling and secret handling for host processes. Domain crates
//! define their own configuration sections; this crate only knows how to
//! load and merge them.

pub mod config;
pub mod logging;
pub mod secret;
pub mod signals;

pub use config::{ConfigError, ConfigLoader, LoggingConfig};
pub use logging::init_logging;
pub use secret::ApiToken;
pub use signals::{shutdown_token, wait_for_shutdown};
