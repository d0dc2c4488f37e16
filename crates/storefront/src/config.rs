//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_OBFUSCATE_ADDRESSES` - Mask personal address fields on store (default: false)
//! - `STOREFRONT_DB_MAX_CONNECTIONS` - Pool size (default: 10)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Mask personal fields of addresses before they are stored (demo stores)
    pub obfuscate_addresses: bool,
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let max_connections = get_env_or_default("STOREFRONT_DB_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_DB_MAX_CONNECTIONS".to_string(), e.to_string())
            })?;
        let obfuscate_addresses = parse_bool(
            "STOREFRONT_OBFUSCATE_ADDRESSES",
            &get_env_or_default("STOREFRONT_OBFUSCATE_ADDRESSES", "false"),
        )?;

        Ok(Self {
            database_url,
            max_connections,
            obfuscate_addresses,
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

/// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        for value in ["true", "TRUE", "1", "yes", " on "] {
            assert!(parse_bool("TEST_VAR", value).unwrap(), "{value}");
        }
    }

    #[test]
    fn test_parse_bool_false_values() {
        for value in ["false", "0", "no", "off", ""] {
            assert!(!parse_bool("TEST_VAR", value).unwrap(), "{value}");
        }
    }

    #[test]
    fn test_parse_bool_invalid() {
        let err = parse_bool("TEST_VAR", "maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TEST_VAR"));
    }

    #[test]
    fn test_get_env_or_default_missing() {
        assert_eq!(
            get_env_or_default("STOREKEEP_TEST_SURELY_UNSET_VAR", "fallback"),
            "fallback"
        );
    }
}
