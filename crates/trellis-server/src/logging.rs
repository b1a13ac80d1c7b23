//! Logging setup.
//!
//! Installs a global `tracing` subscriber with an [`EnvFilter`] built from
//! [`LogConfig::level`] and a JSON or pretty formatting layer.
//!
//! ```rust,ignore
//! use trellis_server::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(addr = "127.0.0.1:8080", "server listening");
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogConfig, LogFormat};
use crate::error::{ServerError, ServerResult};

/// Builds the filter for `config`.
pub fn env_filter(config: &LogConfig) -> ServerResult<EnvFilter> {
    EnvFilter::try_new(&config.level)
        .map_err(|e| ServerError::Logging(format!("invalid log level: {e}")))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `ServerError::Logging` if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> ServerResult<()> {
    let filter = env_filter(config)?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()))
}
