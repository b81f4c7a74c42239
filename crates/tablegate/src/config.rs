//! Configuration loading and validation.
//!
//! Configuration is an explicit value passed into the gateway rather than
//! ambient state; nothing here is global.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GatewayError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration.
    pub connection: ConnectionConfig,

    /// Gateway behavior configuration.
    #[serde(default)]
    pub gateway: GatewayOptions,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.connection.host.is_empty() {
            return Err(GatewayError::Config("connection.host is required".into()));
        }
        if self.connection.database.is_empty() {
            return Err(GatewayError::Config(
                "connection.database is required".into(),
            ));
        }
        if self.connection.user.is_empty() {
            return Err(GatewayError::Config("connection.user is required".into()));
        }
        if self.gateway.default_page_size == 0 {
            return Err(GatewayError::Config(
                "gateway.default_page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// SQL Server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized back out.
    #[serde(skip_serializing)]
    pub password: String,

    /// Application schema (default: "dbo").
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Encrypt connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

/// Gateway behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOptions {
    /// Page size used when the caller does not supply one (default: 50).
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Bound on initial connection establishment in seconds (default: 10).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Bound on waiting for connection readiness in seconds (default: 15).
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        GatewayOptions {
            default_page_size: default_page_size(),
            connect_timeout_secs: default_connect_timeout(),
            ready_timeout_secs: default_ready_timeout(),
        }
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    1433
}

fn default_schema() -> String {
    "dbo".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    50
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ready_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            connection: ConnectionConfig {
                host: "localhost".to_string(),
                port: 1433,
                database: "appdb".to_string(),
                user: "sa".to_string(),
                password: "password".to_string(),
                schema: "dbo".to_string(),
                encrypt: false,
                trust_server_cert: true,
            },
            gateway: GatewayOptions::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.connection.host = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = valid_config();
        config.gateway.default_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = r#"
connection:
  host: db.internal
  database: appdb
  user: reader
  password: s3cret
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.connection.port, 1433);
        assert_eq!(config.connection.schema, "dbo");
        assert!(config.connection.encrypt);
        assert_eq!(config.gateway.default_page_size, 50);
        assert_eq!(config.gateway.connect_timeout_secs, 10);
        assert_eq!(config.gateway.ready_timeout_secs, 15);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = valid_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(
            !yaml.contains("password"),
            "Password was serialized: {}",
            yaml
        );
    }
}
