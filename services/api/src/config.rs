//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::net::SocketAddr;
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
    pub database_url: String,
    pub log_level: Level,
    /// Wall-clock length of one mining session, in hours.
    pub session_duration_hours: i64,
    /// Tokens a full session yields per hashrate unit.
    pub tokens_per_hashrate: f64,
    /// Spin attempts allowed per user per minute.
    pub spin_attempts_per_minute: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure
    /// tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Mining Settings ---
        let session_duration_hours = parse_var("SESSION_DURATION_HOURS", 24i64)?;
        if session_duration_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_DURATION_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let tokens_per_hashrate = parse_var("TOKENS_PER_HASHRATE", 1.0f64)?;
        if tokens_per_hashrate <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "TOKENS_PER_HASHRATE".to_string(),
                "must be positive".to_string(),
            ));
        }
        let spin_attempts_per_minute = parse_var("SPIN_ATTEMPTS_PER_MINUTE", 5u32)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            session_duration_hours,
            tokens_per_hashrate,
            spin_attempts_per_minute,
        })
    }

    /// The accrual tunables derived from this configuration.
    pub fn accrual(&self) -> mining_core::AccrualConfig {
        mining_core::AccrualConfig {
            session_duration: chrono::Duration::hours(self.session_duration_hours),
            tokens_per_hashrate: self.tokens_per_hashrate,
        }
    }
}

/// Parses an optional environment variable, falling back to a default.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' failed to parse", raw))
        }),
    }
}
