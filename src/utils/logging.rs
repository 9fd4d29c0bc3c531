//! Structured logging setup.
//!
//! Console output always goes to stderr: stdout is the protocol channel when
//! the transport runs over stdio.

use crate::config::LoggingConfig;
use crate::error::{Result, TransportError};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Fails with
/// `ConfigError` if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        if config.json_format {
            layers.push(Box::new(layer.json()));
        } else {
            layers.push(Box::new(layer));
        }
    }

    if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            TransportError::ConfigError(
                "log_file_path must be specified when log_to_file is true".to_string(),
            )
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| TransportError::ConfigError(format!("Failed to open log file: {e}")))?;
        let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
        if config.json_format {
            layers.push(Box::new(layer.json()));
        } else {
            layers.push(Box::new(layer));
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| TransportError::ConfigError(format!("Failed to initialize logging: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
