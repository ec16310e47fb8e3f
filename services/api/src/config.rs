//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

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
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub cors_origin: String,
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub http_timeout: Duration,
    pub trends: TrendsConfig,
}

/// Retry and cache tuning for the trend fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrendsConfig {
    pub retries: u32,
    pub initial_backoff: Duration,
    pub cache_capacity: usize,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_backoff: Duration::from_millis(2000),
            cache_capacity: 1,
        }
    }
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Optional Backends ---
        let database_url = optional_var("DATABASE_URL");
        let gemini_api_key = optional_var("GEMINI_API_KEY");

        // --- Model Settings ---
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        let http_timeout = Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", "120")?);

        // --- Trend Fetch Tuning ---
        let cache_capacity: usize = parse_var("TRENDS_CACHE_CAPACITY", "1")?;
        if cache_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "TRENDS_CACHE_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let trends = TrendsConfig {
            retries: parse_var("TRENDS_RETRIES", "2")?,
            initial_backoff: Duration::from_millis(parse_var("TRENDS_BACKOFF_MS", "2000")?),
            cache_capacity,
        };

        Ok(Self {
            bind_address,
            log_level,
            data_dir,
            cors_origin,
            database_url,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            http_timeout,
            trends,
        })
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
