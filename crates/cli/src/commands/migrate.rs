//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations
//! sk-cli migrate storefront
//!
//! # Run admin migrations
//! sk-cli migrate admin
//!
//! # Run all migrations
//! sk-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//!
//! Both fall back to `DATABASE_URL`; the two sets can share one database.
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`
//! Admin migrations: `crates/admin/migrations/`

use storekeep_admin::config::{AdminConfig, ConfigError as AdminConfigError};
use storekeep_storefront::config::{ConfigError as StorefrontConfigError, StorefrontConfig};
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Storefront configuration error: {0}")]
    StorefrontConfig(#[from] StorefrontConfigError),

    #[error("Admin configuration error: {0}")]
    AdminConfig(#[from] AdminConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let config = StorefrontConfig::from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool =
        storekeep_storefront::db::create_pool(&config.database_url, config.max_connections).await?;

    tracing::info!("Running storefront migrations...");
    storekeep_storefront::db::migrator().run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    let config = AdminConfig::from_env()?;

    tracing::info!("Connecting to admin database...");
    let pool =
        storekeep_admin::db::create_pool(&config.database_url, config.max_connections).await?;

    tracing::info!("Running admin migrations...");
    storekeep_admin::db::migrator().run(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
