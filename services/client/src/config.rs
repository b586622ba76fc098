//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";
pub const DEFAULT_BRIDGE_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub auth_store_path: PathBuf,
    pub bridge_origin: String,
    pub http_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Backend ---
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url(&api_base_url)
            .ok_or_else(|| ConfigError::InvalidValue("API_BASE_URL".to_string(), api_base_url))?;

        let http_timeout = match std::env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), e.to_string())
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        // --- Auth persistence ---
        let auth_store_path = match std::env::var("AUTH_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_auth_store_path()
                .ok_or_else(|| ConfigError::MissingVar("AUTH_STORE_PATH".to_string()))?,
        };

        // --- Extension bridge ---
        let bridge_origin = std::env::var("BRIDGE_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_BRIDGE_ORIGIN.to_string());
        if !(bridge_origin.starts_with("http://") || bridge_origin.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "BRIDGE_ORIGIN".to_string(),
                format!("'{}' is not an http(s) origin", bridge_origin),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            auth_store_path,
            bridge_origin,
            http_timeout,
            log_level,
        })
    }
}

/// Where the auth session lives when `AUTH_STORE_PATH` is not set.
pub fn default_auth_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("walkthrough").join("auth.json"))
}

/// Strips trailing slashes; rejects anything that is not an http(s) URL.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    has_host.then(|| trimmed.to_string())
}
