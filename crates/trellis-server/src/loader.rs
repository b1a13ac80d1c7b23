//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use trellis_router::TrailingSlash;

use crate::config::{parse_duration, TrellisConfig};
use crate::error::{ConfigError, ConfigResult};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "TRELLIS";

/// Loads [`TrellisConfig`] in layers, later layers overriding earlier ones:
///
/// 1. built-in defaults
/// 2. a TOML file or string
/// 3. environment variables named `PREFIX__SECTION__KEY`, for example
///    `TRELLIS__SERVER__HTTP_ADDR=127.0.0.1:9000`
///
/// # Example
///
/// ```
/// use trellis_server::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_toml_str("[server]\nhttp_addr = \"127.0.0.1:3000\"")
///     .unwrap()
///     .load_from_env([("TRELLIS__LOGGING__LEVEL".to_string(), "debug".to_string())])
///     .unwrap();
///
/// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
/// assert_eq!(config.logging.level, "debug");
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: TrellisConfig,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TrellisConfig::default(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Replaces the configuration with the contents of a TOML file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        self.with_toml_str(&content)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the configuration with a TOML document.
    pub fn with_toml_str(mut self, content: &str) -> ConfigResult<Self> {
        self.config = toml::from_str(content)?;
        Ok(self)
    }

    /// Sets the environment variable prefix (default `TRELLIS`).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_uppercase();
        self
    }

    /// Applies overrides from the process environment and validates.
    pub fn load(self) -> ConfigResult<TrellisConfig> {
        self.load_from_env(env::vars())
    }

    /// Applies overrides from the given variables and validates.
    ///
    /// Variables not starting with the prefix are ignored.
    pub fn load_from_env<I>(mut self, vars: I) -> ConfigResult<TrellisConfig>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}__", self.env_prefix);
        for (key, value) in vars {
            if let Some(rest) = key.strip_prefix(&marker) {
                self.apply_env_var(&key, rest, &value)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> TrellisConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, rest: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = rest.split("__").collect();
        let server = &mut self.config.server;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT"] => {
                server.shutdown_timeout = parse_timeout(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT"] => {
                server.request_timeout = parse_timeout(key, value)?;
            }
            ["SERVER", "TRAILING_SLASH"] => {
                server.trailing_slash = value
                    .parse::<TrailingSlash>()
                    .map_err(|e| ConfigError::env_parse(key, e.to_string()))?;
            }
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key, "expected 'json' or 'pretty'"))?;
            }
            _ => return Err(ConfigError::env_parse(key, "unknown configuration key")),
        }

        tracing::debug!(var = key, "applied environment override");
        Ok(())
    }
}

fn parse_timeout(key: &str, value: &str) -> ConfigResult<Duration> {
    parse_duration(value).map_err(|reason| ConfigError::env_parse(key, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = ConfigLoader::new().load_from_env(Vec::new()).unwrap();
        assert_eq!(config, TrellisConfig::default());
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nhttp_addr = \"127.0.0.1:7000\"\ntrailing_slash = \"reject\""
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load_from_env(Vec::new())
            .unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:7000");
        assert_eq!(config.server.trailing_slash, TrailingSlash::Reject);
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::new().with_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_optional_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .unwrap()
            .load_unvalidated();
        assert_eq!(config, TrellisConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ConfigLoader::new().with_toml_str("[server\nhttp_addr = 1");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ConfigLoader::new()
            .with_toml_str("[server]\nhttp_addr = \"127.0.0.1:7000\"")
            .unwrap()
            .load_from_env(vars(&[
                ("TRELLIS__SERVER__HTTP_ADDR", "127.0.0.1:7100"),
                ("TRELLIS__SERVER__SHUTDOWN_TIMEOUT", "3"),
                ("TRELLIS__SERVER__REQUEST_TIMEOUT", "750ms"),
                ("TRELLIS__SERVER__TRAILING_SLASH", "reject"),
                ("TRELLIS__LOGGING__LEVEL", "warn"),
                ("TRELLIS__LOGGING__FORMAT", "pretty"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:7100");
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(config.server.request_timeout(), Duration::from_millis(750));
        assert_eq!(config.server.trailing_slash, TrailingSlash::Reject);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_custom_prefix() {
        let config = ConfigLoader::new()
            .with_env_prefix("news")
            .load_from_env(vars(&[
                ("NEWS__SERVER__HTTP_ADDR", "127.0.0.1:7200"),
                ("TRELLIS__SERVER__HTTP_ADDR", "127.0.0.1:7300"),
            ]))
            .unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:7200");
    }

    #[test]
    fn test_env_parse_errors() {
        let result = ConfigLoader::new()
            .load_from_env(vars(&[("TRELLIS__SERVER__REQUEST_TIMEOUT", "soon")]));
        assert!(matches!(result, Err(ConfigError::EnvParse { .. })));

        let result =
            ConfigLoader::new().load_from_env(vars(&[("TRELLIS__SERVER__TRAILING_SLASH", "keep")]));
        assert!(matches!(result, Err(ConfigError::EnvParse { .. })));

        let result = ConfigLoader::new().load_from_env(vars(&[("TRELLIS__SERVER__PORT", "80")]));
        assert!(matches!(result, Err(ConfigError::EnvParse { .. })));
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .load_from_env(vars(&[("TRELLIS__SERVER__HTTP_ADDR", "not an address")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
