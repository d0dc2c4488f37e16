//! Customer and address book commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a customer
//! sk-cli user create -f Ada -l Lovelace
//!
//! # Store an address, making it the default billing address if none is set
//! sk-cli user address add 1 --type billing --first-name Ada --street "12 Main St" --city London --country GB
//!
//! # Install a new default shipping address (the old one stays in the book)
//! sk-cli user address add 1 --type shipping --default --street "1 Dock Rd" --city Leeds --country GB
//!
//! # Show the address book
//! sk-cli user show 1
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `STOREFRONT_OBFUSCATE_ADDRESSES` - Mask personal fields before storing

use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use storekeep_core::{Address, AddressData, AddressId, AddressType, DisplayName, User, UserId};
use storekeep_storefront::config::{ConfigError, StorefrontConfig};
use storekeep_storefront::db::{self, RepositoryError, UserRepository};
use storekeep_storefront::services::{AddressBookError, AddressBookService};

/// Errors that can occur during user commands.
#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    AddressBook(#[from] AddressBookError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Address fields accepted on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct AddressArgs {
    #[arg(long, default_value = "")]
    pub first_name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long, default_value = "")]
    pub street: String,
    #[arg(long, default_value = "")]
    pub street_2: String,
    #[arg(long, default_value = "")]
    pub city: String,
    #[arg(long, default_value = "")]
    pub city_area: String,
    #[arg(long, default_value = "")]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code
    #[arg(long, default_value = "")]
    pub country: String,
    #[arg(long, default_value = "")]
    pub country_area: String,
    #[arg(long, default_value = "")]
    pub phone: String,
}

impl From<AddressArgs> for AddressData {
    fn from(args: AddressArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            company_name: args.company,
            street_address_1: args.street,
            street_address_2: args.street_2,
            city: args.city,
            city_area: args.city_area,
            postal_code: args.postal_code,
            country: args.country,
            country_area: args.country_area,
            phone: args.phone,
        }
    }
}

/// JSON view of a user's address book.
#[derive(Debug, Serialize)]
struct UserView {
    id: UserId,
    display_name: DisplayName,
    default_billing_address_id: Option<AddressId>,
    default_shipping_address_id: Option<AddressId>,
    addresses: Vec<Address>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.resolve_display_name(),
            default_billing_address_id: user.default_address_id(AddressType::Billing),
            default_shipping_address_id: user.default_address_id(AddressType::Shipping),
            addresses: user
                .addresses()
                .iter()
                .map(|(id, data)| Address::new(id, data.clone()))
                .collect(),
        }
    }
}

/// Create a customer with an empty address book.
///
/// # Errors
///
/// Returns `UserCommandError` if the database is unreachable or the insert fails.
pub async fn create(first_name: &str, last_name: &str) -> Result<UserId, UserCommandError> {
    let (pool, _) = connect().await?;
    let user = UserRepository::new(&pool).create(first_name, last_name).await?;

    tracing::info!(user_id = %user.id, "Customer created");
    print_json(&UserView::from(&user))?;
    Ok(user.id)
}

/// Print a customer's address book as JSON.
///
/// # Errors
///
/// Returns `UserCommandError` if the user doesn't exist or a query fails.
pub async fn show(user_id: UserId) -> Result<(), UserCommandError> {
    let (pool, config) = connect().await?;
    let service = AddressBookService::new(&pool, config.obfuscate_addresses);

    let user = service.get_user(user_id).await?;
    print_json(&UserView::from(&user))
}

/// Store an address. With `make_default`, it replaces the current default of
/// `address_type`; otherwise it only fills an empty default.
///
/// # Errors
///
/// Returns `UserCommandError` if the user doesn't exist or storage fails.
pub async fn add_address(
    user_id: UserId,
    address: AddressArgs,
    address_type: AddressType,
    make_default: bool,
) -> Result<AddressId, UserCommandError> {
    let (pool, config) = connect().await?;
    let service = AddressBookService::new(&pool, config.obfuscate_addresses);

    let address_id = if make_default {
        service
            .change_default_address(user_id, address.into(), address_type)
            .await?
    } else {
        service
            .store_address(user_id, address.into(), address_type)
            .await?
    };

    print_json(&address_id)?;
    Ok(address_id)
}

/// Point a default at an address already in the book.
///
/// # Errors
///
/// Returns `UserCommandError` if the address isn't in the user's book.
pub async fn set_default(
    user_id: UserId,
    address_id: AddressId,
    address_type: AddressType,
) -> Result<(), UserCommandError> {
    let (pool, config) = connect().await?;
    AddressBookService::new(&pool, config.obfuscate_addresses)
        .set_default_address(user_id, address_id, address_type)
        .await?;
    Ok(())
}

/// Delete an address from the book.
///
/// # Errors
///
/// Returns `UserCommandError` if the address isn't in the user's book.
pub async fn delete_address(user_id: UserId, address_id: AddressId) -> Result<(), UserCommandError> {
    let (pool, config) = connect().await?;
    AddressBookService::new(&pool, config.obfuscate_addresses)
        .delete_address(user_id, address_id)
        .await?;
    Ok(())
}

async fn connect() -> Result<(PgPool, StorefrontConfig), UserCommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::debug!("Connecting to storefront database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    Ok((pool, config))
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl Serialize) -> Result<(), UserCommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_args_map_to_fields() {
        let args = AddressArgs {
            company: "Analytical Engines".to_owned(),
            street: "12 Main St".to_owned(),
            street_2: "Flat 2".to_owned(),
            ..AddressArgs::default()
        };
        let data = AddressData::from(args);
        assert_eq!(data.company_name, "Analytical Engines");
        assert_eq!(data.street_address_1, "12 Main St");
        assert_eq!(data.street_address_2, "Flat 2");
        assert!(data.phone.is_empty());
    }

    #[test]
    fn test_user_view_lists_book_and_defaults() {
        let mut user = User::new(UserId::new(5)).with_names("Ada", "");
        let stored = user.store_address(
            AddressData {
                last_name: "Lovelace".to_owned(),
                ..AddressData::default()
            },
            AddressType::Billing,
        );

        let view = UserView::from(&user);
        assert_eq!(view.addresses.len(), 1);
        assert_eq!(view.default_billing_address_id, Some(stored.address_id));
        assert_eq!(view.default_shipping_address_id, None);
        assert_eq!(view.display_name.last_name.as_deref(), Some("Lovelace"));
    }
}
