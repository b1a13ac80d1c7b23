//! Server configuration.
//!
//! [`TrellisConfig`] is the root of the TOML configuration file:
//!
//! ```toml
//! [server]
//! http_addr = "127.0.0.1:8080"
//! shutdown_timeout = "30s"
//! request_timeout = "500ms"
//! trailing_slash = "strip"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Timeouts take a unit suffix (`ms`, `s`, `m`, `h`); a bare integer is
//! seconds.
//! Use [`ConfigLoader`](crate::ConfigLoader) to layer a file and
//! environment overrides on top of the defaults.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use trellis_router::{RouterConfig, TrailingSlash};

use crate::error::{ConfigError, ConfigResult};

/// Complete Trellis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TrellisConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,
}

impl TrellisConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.logging.validate()
    }
}

/// HTTP server configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_server::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .http_addr("127.0.0.1:3000")
///     .request_timeout(Duration::from_secs(5))
///     .build();
///
/// assert_eq!(config.http_addr(), "127.0.0.1:3000");
/// assert_eq!(config.request_timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Time allowed for open connections to finish after shutdown.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Per-request timeout, covering body collection and the handler.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// How request paths with a trailing slash are treated.
    #[serde(default)]
    pub trailing_slash: TrailingSlash,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout: default_timeout(),
            request_timeout: default_timeout(),
            trailing_slash: TrailingSlash::default(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ServerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the configured bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if `http_addr` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the router settings derived from this configuration.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            trailing_slash: self.trailing_slash,
        }
    }

    /// Validates the address and timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.socket_addr()
            .map_err(|e| ConfigError::invalid_value("server.http_addr", e.to_string()))?;

        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout",
                "must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "server.request_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the trailing-slash policy for request paths.
    #[must_use]
    pub fn trailing_slash(mut self, policy: TrailingSlash) -> Self {
        self.config.trailing_slash = policy;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::invalid_value(
                "logging.format",
                format!("expected 'json' or 'pretty', got '{s}'"),
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive (e.g., "info" or "trellis_router=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        EnvFilter::try_new(&self.level)
            .map(drop)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
    }
}

/// Parses a timeout such as `"500ms"`, `"30s"`, `"2m"` or `"1h"`.
///
/// A bare number is seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, millis_per_unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (s, 1_000)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(millis_per_unit))
        .map(Duration::from_millis)
        .ok_or_else(|| format!("invalid duration '{s}'"))
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Secs(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => {
                super::parse_duration(&text).map_err(serde::de::Error::custom)
            }
        }
    }
}
