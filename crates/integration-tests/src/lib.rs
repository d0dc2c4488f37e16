//! Integration tests for Storekeep.
//!
//! # Running Tests
//!
//! ```bash
//! # Domain tests, no database needed
//! cargo test -p storekeep-integration-tests
//!
//! # Database tests (PostgreSQL 15+, migrations are applied automatically)
//! STOREFRONT_DATABASE_URL=postgres://... ADMIN_DATABASE_URL=postgres://... \
//!     cargo test -p storekeep-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `address_book` - Default address rules, in memory
//! - `discount_scope` - Catalogue scope and discount lifecycle, in memory
//! - `storefront_db` - Address book persistence
//! - `admin_db` - Voucher and sale persistence
//! - `shared_database` - Both migration sets in one database

use sqlx::PgPool;

use storekeep_admin::config::AdminConfig;
use storekeep_core::AddressData;
use storekeep_storefront::config::StorefrontConfig;

/// Error type for test setup.
pub type SetupError = Box<dyn std::error::Error + Send + Sync>;

/// Connect to the storefront database and bring its schema up to date.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is unreachable.
pub async fn storefront_pool() -> Result<PgPool, SetupError> {
    let config = StorefrontConfig::from_env()?;
    let pool = storekeep_storefront::db::create_pool(&config.database_url, 2).await?;
    storekeep_storefront::db::migrator().run(&pool).await?;
    Ok(pool)
}

/// Connect to the admin database and bring its schema up to date.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is unreachable.
pub async fn admin_pool() -> Result<PgPool, SetupError> {
    let config = AdminConfig::from_env()?;
    let pool = storekeep_admin::db::create_pool(&config.database_url, 2).await?;
    storekeep_admin::db::migrator().run(&pool).await?;
    Ok(pool)
}

/// A minimal address: street and city, everything else empty.
#[must_use]
pub fn address(street: &str, city: &str) -> AddressData {
    AddressData {
        street_address_1: street.to_owned(),
        city: city.to_owned(),
        ..AddressData::default()
    }
}
