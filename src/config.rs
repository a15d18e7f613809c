//! Configuration management for Loadgauge
//!
//! Parses an optional TOML configuration file and provides typed access to
//! settings. Every field has a default, so an empty file (or no file at all)
//! yields a working server on `:9090` answering `nothing`.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Listen address; `:port` binds all interfaces
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Body written (plus a newline) by every weighted endpoint
    #[serde(default = "default_display")]
    pub display: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            display: default_display(),
        }
    }
}

fn default_listen_addr() -> String {
    ":9090".to_string()
}

fn default_display() -> String {
    "nothing".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Normalize a listen address into something `TcpListener::bind` accepts
///
/// Accepts `:port` (all interfaces), `host:port` and `[v6]:port`.
///
/// # Errors
/// Returns an error when the port is missing or not a valid `u16`, or an
/// IPv6 host is not wrapped in brackets.
pub fn normalize_listen_addr(addr: &str) -> AppResult<String> {
    let addr = addr.trim();
    let (host, port) = addr.rsplit_once(':').ok_or_else(|| {
        AppError::Config(format!(
            "listen address '{}' must be of the form [host]:port",
            addr
        ))
    })?;

    port.parse::<u16>().map_err(|_| {
        AppError::Config(format!(
            "listen address '{}' has invalid port '{}'",
            addr, port
        ))
    })?;

    if host.is_empty() {
        return Ok(format!("0.0.0.0:{}", port));
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(AppError::Config(format!(
            "listen address '{}' must wrap IPv6 hosts in brackets",
            addr
        )));
    }
    Ok(addr.to_string())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path_display, "Loaded configuration file");
        Ok(config)
    }

    /// Address to bind, normalized from `server.listen_addr`
    pub fn bind_addr(&self) -> AppResult<String> {
        normalize_listen_addr(&self.server.listen_addr)
    }

    /// Validate configuration after parsing or after CLI overrides
    pub fn validate(&self) -> AppResult<()> {
        self.bind_addr()?;

        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "log_level '{}' must be one of: {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_CONFIG: &str = r#"
[server]
listen_addr = "127.0.0.1:8080"
display = "hello"

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.server.display, "hello");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").expect("empty config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.server.listen_addr, ":9090");
        assert_eq!(config.server.display, "nothing");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_server_section_fills_defaults() {
        let config = Config::from_str("[server]\ndisplay = \"busy\"\n").unwrap();
        assert_eq!(config.server.listen_addr, ":9090");
        assert_eq!(config.server.display, "busy");
    }

    #[test]
    fn test_normalize_listen_addr() {
        assert_eq!(normalize_listen_addr(":9090").unwrap(), "0.0.0.0:9090");
        assert_eq!(
            normalize_listen_addr("127.0.0.1:80").unwrap(),
            "127.0.0.1:80"
        );
        assert_eq!(
            normalize_listen_addr("localhost:3000").unwrap(),
            "localhost:3000"
        );
        assert_eq!(normalize_listen_addr("[::1]:9090").unwrap(), "[::1]:9090");
    }

    #[test]
    fn test_normalize_listen_addr_rejects_invalid() {
        assert!(normalize_listen_addr("9090").is_err());
        assert!(normalize_listen_addr(":notaport").is_err());
        assert!(normalize_listen_addr(":70000").is_err());
        assert!(normalize_listen_addr("::1:9090").is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let result = Config::from_str("[observability]\nlog_level = \"loud\"\n");
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("loud")));
    }

    #[test]
    fn test_parse_error_reports_string_source() {
        let result = Config::from_str("[server\n");
        match result {
            Err(AppError::ConfigParseFailed { path, .. }) => assert_eq!(path, "<string>"),
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).expect("should load file");
        assert_eq!(config.server.display, "hello");
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn test_from_file_missing_reports_path() {
        let result = Config::from_file("/nonexistent/loadgauge.toml");
        match result {
            Err(AppError::ConfigFileRead { path, .. }) => {
                assert_eq!(path, "/nonexistent/loadgauge.toml")
            }
            other => panic!("expected read failure, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_validation_error_mentions_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[server]\nlisten_addr = \"nowhere\"\n")
            .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        let path = file.path().display().to_string();
        assert!(err.to_string().contains(&path));
    }
}
