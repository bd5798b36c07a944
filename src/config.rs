//! Configuration for the exporter.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// RCON connection settings.
    #[serde(default)]
    pub rcon: RconConfig,

    /// Collector enablement settings.
    #[serde(default)]
    pub collectors: CollectorsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP scrape endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on (default: "0.0.0.0:9940").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Maximum scrape requests in flight; 0 disables the cap (default: 40).
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

fn default_listen() -> String {
    "0.0.0.0:9940".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_max_requests() -> usize {
    40
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            max_requests: default_max_requests(),
        }
    }
}

/// RCON endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconConfig {
    /// Server address as `host:port` (default: "localhost:25575").
    #[serde(default = "default_rcon_address")]
    pub address: String,

    /// Shared secret configured as `rcon.password` on the server.
    #[serde(default)]
    pub password: String,

    /// Deadline for one connect-auth-command exchange, in milliseconds
    /// (default: 5000).
    #[serde(default = "default_rcon_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_rcon_address() -> String {
    "localhost:25575".to_string()
}

fn default_rcon_timeout_ms() -> u64 {
    5000
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            address: default_rcon_address(),
            password: String::new(),
            timeout_ms: default_rcon_timeout_ms(),
        }
    }
}

/// Collector enablement, resolved once at startup and read-only while
/// serving.
///
/// A collector's effective default is: the per-name entry in `defaults` if
/// present, otherwise its built-in flag unless `disable_defaults` is set.
/// Per-scrape `collect[]` / `exclude[]` filters apply on top of this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// Flip every collector's default-enabled flag to false.
    #[serde(default)]
    pub disable_defaults: bool,

    /// Per-collector default-enabled overrides, keyed by collector name.
    #[serde(default)]
    pub defaults: HashMap<String, bool>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ExporterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.http.listen
            )));
        }

        if !self.http.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.rcon.address.is_empty() {
            return Err(ConfigError::Validation(
                "RCON address must not be empty".to_string(),
            ));
        }

        if self.rcon.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "rcon.timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.http.listen, "0.0.0.0:9940");
        assert_eq!(config.http.path, "/metrics");
        assert_eq!(config.http.max_requests, 40);
        assert_eq!(config.rcon.address, "localhost:25575");
        assert_eq!(config.rcon.password, "");
        assert_eq!(config.rcon.timeout_ms, 5000);
        assert!(!config.collectors.disable_defaults);
        assert!(config.collectors.defaults.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            http: {
                listen: "127.0.0.1:9941",
                path: "/mc/metrics",
                max_requests: 4
            },
            rcon: {
                address: "mc.example.net:25575",
                password: "hunter2",
                timeout_ms: 1500
            },
            collectors: {
                disable_defaults: true,
                defaults: { players: true }
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.http.listen, "127.0.0.1:9941");
        assert_eq!(config.http.path, "/mc/metrics");
        assert_eq!(config.http.max_requests, 4);
        assert_eq!(config.rcon.address, "mc.example.net:25575");
        assert_eq!(config.rcon.password, "hunter2");
        assert_eq!(config.rcon.timeout_ms, 1500);
        assert!(config.collectors.disable_defaults);
        assert_eq!(config.collectors.defaults.get("players"), Some(&true));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ rcon: {{ password: "from-file" }} }}"#).unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.rcon.password, "from-file");
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ http: { listen: "not-an-address" } }"#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ http: { path: "no-leading-slash" } }"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must start with /"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let result = ExporterConfig::parse(r#"{ rcon: { timeout_ms: 0 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_rcon_address() {
        let result = ExporterConfig::parse(r#"{ rcon: { address: "" } }"#);
        assert!(result.is_err());
    }
}
