//! Server and configuration error types.

use std::path::PathBuf;

use thiserror::Error;
use trellis_router::RegistrationError;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read configuration file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be applied.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParse {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates an environment parse error.
    pub fn env_parse(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParse {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by the HTTP server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Underlying parse error.
        #[source]
        source: std::net::AddrParseError,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: std::net::SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The logging subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}
