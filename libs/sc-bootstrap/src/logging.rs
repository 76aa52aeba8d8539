//! Tracing subscriber setup.
//!
//! Human-readable output always goes to stderr so that `--json` command
//! output on stdout stays machine-parseable. An optional file layer is written
//! through a non-blocking appender whose guard lives for the whole process.

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

static FILE_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Build the level filter. `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
///
/// # Errors
/// Returns an error if the log file cannot be created.
pub fn init_logging(config: &LoggingConfig) -> io::Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(build_filter(&config.level));

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = if config.json {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_filter(build_filter(&config.level))
                    .boxed()
            } else {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(build_filter(&config.level))
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .is_ok();

    // A subscriber installed elsewhere (tests) keeps priority
    if !installed {
        tracing::debug!("global tracing subscriber already set");
    }

    let _ = FILE_GUARD.set(guard);

    if let Some(path) = &config.file {
        tracing::info!(path = %path.display(), json = config.json, "file logging enabled");
    }
    Ok(())
}
