//! Configuration management for the Gateway
//!
//! This module handles loading and validation of all gateway configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::utils::error::{GatewayError, Result};

/// Default server host
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8000
}

/// Default maximum request body size in bytes
pub fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_organization_id() -> String {
    "00000000-0000-0000-0000-000000000000".to_string()
}

fn default_true() -> bool {
    true
}

/// Main configuration struct for the Gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Filter store configuration
    pub database: DatabaseConfig,
    /// Filtering behavior configuration
    pub filtering: FilteringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: Option<usize>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            max_body_size: default_max_body_size(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Maximum connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
    /// Enable database (if false, use in-memory storage)
    pub enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            enabled: false,
        }
    }
}

/// Filtering behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// Organization used when a request carries no tenant identity
    pub default_organization_id: String,
    /// Persist violation rows for warn/audit/block outcomes
    pub log_violations: bool,
    /// Run the response-capture middleware on the outbound leg
    pub filter_responses: bool,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            default_organization_id: default_organization_id(),
            log_violations: default_true(),
            filter_responses: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(mut self) -> Self {
        if let Ok(host) = std::env::var("FILTERGATE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FILTERGATE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("FILTERGATE_DATABASE_URL") {
            self.database.url = url;
            self.database.enabled = true;
        }
        if let Ok(org) = std::env::var("FILTERGATE_DEFAULT_ORG") {
            self.filtering.default_organization_id = org;
        }
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        if self.server.port == 0 {
            return Err(GatewayError::Config(
                "Server config error: port cannot be 0".to_string(),
            ));
        }
        if self.database.enabled && self.database.url.is_empty() {
            return Err(GatewayError::Config(
                "Database config error: url is required when enabled".to_string(),
            ));
        }
        if self.filtering.default_organization_id.is_empty() {
            return Err(GatewayError::Config(
                "Filtering config error: default_organization_id cannot be empty".to_string(),
            ));
        }

        debug!("Configuration validation completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert!(!config.database.enabled);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
server:
  port: 9000
filtering:
  filter_responses: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, default_host());
        assert!(config.filtering.filter_responses);
        assert!(config.filtering.log_violations);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let config = Config {
            server: ServerConfig {
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
