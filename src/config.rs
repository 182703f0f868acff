//! Environment-driven configuration for the desk agent.
//!
//! Everything is read once at process start. A missing reasoning-service
//! credential does not prevent startup; it leaves every chat turn failing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable carrying the reasoning-service credential.
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable overriding the reasoning-service base URL.
const GEMINI_URL_ENV: &str = "CLINICDESK_GEMINI_URL";
/// Environment variable overriding the model name.
const MODEL_ENV: &str = "CLINICDESK_MODEL";
/// Environment variable overriding the `SQLite` path.
const DB_PATH_ENV: &str = "CLINICDESK_DB_PATH";
/// Environment variable overriding the listen port.
const PORT_ENV: &str = "CLINICDESK_PORT";

/// Default reasoning-service endpoint.
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model name.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reasoning-service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API credential; empty when unset.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Sampling temperature for generation.
    pub temperature: f64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_URL.to_string(),
            temperature: 0.1,
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("appointments.sqlite"),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::server::DEFAULT_PORT,
        }
    }
}

/// Top-level configuration for the desk agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reasoning-service settings.
    pub gemini: GeminiConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AgentConfig {
    /// Build configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV) {
            config.gemini.api_key = key;
        }
        if let Ok(url) = std::env::var(GEMINI_URL_ENV) {
            config.gemini.base_url = url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            config.gemini.model = model;
        }
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        config.server.port = std::env::var(PORT_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(config.server.port);

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "gemini.model must not be empty".to_string(),
            ));
        }

        Url::parse(&self.gemini.base_url)?;

        if self.storage.sqlite_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "storage.sqlite_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
