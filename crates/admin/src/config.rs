//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ADMIN_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `ADMIN_VOUCHER_CODE_LENGTH` - Length of generated voucher codes (default: 12, range 6-32)

use std::ops::RangeInclusive;

use secrecy::SecretString;
use thiserror::Error;

/// Allowed lengths for generated voucher codes.
const VOUCHER_CODE_LENGTHS: RangeInclusive<usize> = 6..=32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Length of voucher codes generated when none is supplied
    pub voucher_code_length: usize,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let max_connections = get_env_or_default("ADMIN_DB_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ADMIN_DB_MAX_CONNECTIONS".to_string(), e.to_string())
            })?;
        let voucher_code_length = parse_code_length(
            "ADMIN_VOUCHER_CODE_LENGTH",
            &get_env_or_default("ADMIN_VOUCHER_CODE_LENGTH", "12"),
        )?;

        Ok(Self {
            database_url,
            max_connections,
            voucher_code_length,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_code_length(key: &str, value: &str) -> Result<usize, ConfigError> {
    let length = value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !VOUCHER_CODE_LENGTHS.contains(&length) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!(
                "must be between {} and {}, got {length}",
                VOUCHER_CODE_LENGTHS.start(),
                VOUCHER_CODE_LENGTHS.end()
            ),
        ));
    }
    Ok(length)
}
