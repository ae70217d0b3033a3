//! Configuration for the ratgdo exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
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
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Upstream status endpoint settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Value of the `location` label applied to every gauge.
    #[serde(default = "default_location")]
    pub location: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream ratgdo status endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// URL of the device's JSON status endpoint.
    #[serde(default = "default_json_address")]
    pub json_address: String,

    /// Request timeout in seconds, covering connect and body read.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_json_address() -> String {
    "http://ratgdo/status.json".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            json_address: default_json_address(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric name prefix (default: "homekit_ratgdo").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_prefix() -> String {
    "homekit_ratgdo".to_string()
}

fn default_location() -> String {
    "home".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            prefix: default_prefix(),
        }
    }
}

impl PrometheusConfig {
    /// Replace the port of the listen address, keeping the host.
    pub fn set_port(&mut self, port: &str) {
        let host = match self.listen.rsplit_once(':') {
            Some((host, _)) => host,
            None => "0.0.0.0",
        };
        self.listen = format!("{}:{}", host, port);
    }
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
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let address = &self.upstream.json_address;
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "json_address must be an http(s) URL: {}",
                address
            )));
        }
        if reqwest::Url::parse(address).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid json_address: {}",
                address
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if !is_valid_prefix(&self.prometheus.prefix) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric prefix: {}",
                self.prometheus.prefix
            )));
        }

        if self.location.is_empty() {
            return Err(ConfigError::Validation(
                "location must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            prometheus: PrometheusConfig::default(),
            location: default_location(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.upstream.json_address, "http://ratgdo/status.json");
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.prometheus.listen, "0.0.0.0:8080");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.prometheus.prefix, "homekit_ratgdo");
        assert_eq!(config.location, "home");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            upstream: {
                json_address: "http://192.168.1.40/status.json",
                timeout_secs: 3,
            },
            prometheus: {
                listen: "127.0.0.1:9101",
                path: "/prometheus/metrics",
                prefix: "garage",
            },
            location: "cabin",
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(
            config.upstream.json_address,
            "http://192.168.1.40/status.json"
        );
        assert_eq!(config.upstream.timeout_secs, 3);
        assert_eq!(config.prometheus.listen, "127.0.0.1:9101");
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(config.prometheus.prefix, "garage");
        assert_eq!(config.location, "cabin");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ location: "barn" }}"#).unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.location, "barn");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/ratgdo.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_validate_invalid_json_address() {
        let json = r#"{ upstream: { json_address: "ratgdo/status.json" } }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("json_address"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let json = r#"{ upstream: { timeout_secs: 0 } }"#;

        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            prometheus: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
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
        let json = r#"{
            prometheus: { path: "no-leading-slash" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_invalid_prefix() {
        let json = r#"{ prometheus: { prefix: "1bad-prefix" } }"#;

        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_empty_location() {
        let json = r#"{ location: "" }"#;

        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_set_port() {
        let mut prometheus = PrometheusConfig::default();
        prometheus.set_port("9200");
        assert_eq!(prometheus.listen, "0.0.0.0:9200");

        let mut prometheus = PrometheusConfig {
            listen: "[::1]:8080".to_string(),
            ..Default::default()
        };
        prometheus.set_port("9300");
        assert_eq!(prometheus.listen, "[::1]:9300");
    }
}
