//! Configuration Module
//!
//! Loads service configuration from a YAML file and environment variables.
//! Environment variables use the `APP_` prefix and `__` between nested keys,
//! e.g. `APP_KEYCLOAK__CLIENT_SECRET`.
//!
//! # License
//! Licensed under the AGPLv3 license.

use std::time::Duration;

use config::{Config as ConfigFile, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::keycloak::KeycloakConfig;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/application.yml";

/// Outbound HTTP settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub endpoint: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

/// Application configuration settings
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Keycloak connection settings
    pub keycloak: KeycloakConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Missing required config value: {0}")]
    MissingConfig(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl Config {
    /// Loads configuration from the file named by `CONFIG_PATH` (default
    /// `config/application.yml`), then applies `APP_` environment overrides.
    ///
    /// # Errors
    /// Returns a `ConfigError` if the file cannot be read or parsed, or if a
    /// required Keycloak setting is empty.
    pub fn new() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let builder = ConfigFile::builder()
            .add_source(File::with_name(&path))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    /// Parses configuration from YAML text, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Self::build(ConfigFile::builder().add_source(File::from_str(yaml, FileFormat::Yaml)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.keycloak.missing_field() {
            Some(field) => Err(ConfigError::MissingConfig(format!("keycloak.{}", field))),
            None => Ok(()),
        }
    }
}
