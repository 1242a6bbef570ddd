//! Configuration handling for vector_tools

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete vector_tools configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub naming: NamingConfig,
    pub oracle: OracleConfig,
    pub postgres: PostgresConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

/// Field naming limits
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    /// Maximum length of a generated field name
    pub max_length: usize,
    /// Characters kept before a `_N` suffix is appended
    pub stem_length: usize,
    /// Length given to synthesized numeric fields
    pub numeric_length: i32,
    /// Precision given to synthesized numeric fields
    pub numeric_precision: i32,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_length: 10,
            stem_length: 8,
            numeric_length: 24,
            numeric_precision: 15,
        }
    }
}

/// Oracle connection string settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OracleConfig {
    /// Listener port left out of generated connection strings
    pub default_port: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            default_port: "1521".to_string(),
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PostgresConfig {
    /// Upper bound on credential prompts; `None` keeps prompting until cancelled
    pub max_credential_attempts: Option<u32>,
    pub connect_timeout_seconds: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_credential_attempts: None,
            connect_timeout_seconds: 30,
        }
    }
}

/// Table output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub default_encoding: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_encoding: "utf-8".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.naming.max_length, 10);
        assert_eq!(config.naming.stem_length, 8);
        assert_eq!(config.oracle.default_port, "1521");
        assert!(config.postgres.max_credential_attempts.is_none());
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [naming]
            max_length = 12

            [postgres]
            max_credential_attempts = 3

            [logging]
            level = "debug"
            format = "json"
            stdout = true
            "#,
        )
        .unwrap();

        assert_eq!(config.naming.max_length, 12);
        assert_eq!(config.naming.stem_length, 8);
        assert_eq!(config.postgres.max_credential_attempts, Some(3));
        assert_eq!(config.postgres.connect_timeout_seconds, 30);
        assert_eq!(config.logging.unwrap().format, "json");
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file("/nonexistent/vector_tools.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
