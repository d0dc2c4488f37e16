//! Address book service.
//!
//! Every operation runs in one transaction: lock the user row, apply the core
//! address book operation in memory, write back the reported changes, commit.
//! A failing operation rolls back and leaves storage untouched.

mod error;

pub use error::AddressBookError;

use sqlx::PgPool;
use tracing::{info, instrument};

use storekeep_core::{
    AccountChange, AddressData, AddressId, AddressType, DisplayName, User, UserId,
};

use crate::db::users::{self, UserRepository};

/// Address book service.
///
/// Stores addresses and maintains each user's default billing and shipping
/// address.
pub struct AddressBookService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
    obfuscate_addresses: bool,
}

impl<'a> AddressBookService<'a> {
    /// Create a new address book service.
    ///
    /// With `obfuscate_addresses` set, personal fields of stored addresses are
    /// masked before they reach the database.
    #[must_use]
    pub const fn new(pool: &'a PgPool, obfuscate_addresses: bool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
            obfuscate_addresses,
        }
    }

    /// Get a user with their address book.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AddressBookError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AddressBookError::UserNotFound(user_id))
    }

    /// Add an address to the user's book, making it the default of
    /// `address_type` if the user has none yet.
    ///
    /// Returns the id of the (new or reused) book entry.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    /// Returns `AddressBookError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id, address_type = %address_type))]
    pub async fn store_address(
        &self,
        user_id: UserId,
        data: AddressData,
        address_type: AddressType,
    ) -> Result<AddressId, AddressBookError> {
        let data = prepare_address(data, self.obfuscate_addresses);
        let (address_id, created) = self
            .with_locked_user(user_id, |user| {
                let stored = user.store_address(data, address_type);
                Ok(((stored.address_id, stored.created), stored.changes))
            })
            .await?;

        info!(%address_id, created, "Address stored");
        Ok(address_id)
    }

    /// Point the user's default of `address_type` at one of their addresses.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::Account` if the address belongs to someone else.
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    #[instrument(skip_all, fields(user_id = %user_id, address_id = %address_id, address_type = %address_type))]
    pub async fn set_default_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
        address_type: AddressType,
    ) -> Result<(), AddressBookError> {
        self.with_locked_user(user_id, |user| {
            let changes = user.set_default_address(address_id, address_type)?;
            Ok(((), changes))
        })
        .await?;

        info!("Default address set");
        Ok(())
    }

    /// Install a new default address of `address_type`, keeping the previous
    /// default in the book.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    /// Returns `AddressBookError::Repository` if storage fails.
    #[instrument(skip_all, fields(user_id = %user_id, address_type = %address_type))]
    pub async fn change_default_address(
        &self,
        user_id: UserId,
        data: AddressData,
        address_type: AddressType,
    ) -> Result<AddressId, AddressBookError> {
        let data = prepare_address(data, self.obfuscate_addresses);
        let address_id = self
            .with_locked_user(user_id, |user| {
                let stored = user.change_default_address(data, address_type);
                Ok((stored.address_id, stored.changes))
            })
            .await?;

        info!(%address_id, "Default address changed");
        Ok(address_id)
    }

    /// Remove an address, clearing any default that points at it.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::Account` if the address isn't in the user's book.
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    #[instrument(skip_all, fields(user_id = %user_id, address_id = %address_id))]
    pub async fn delete_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(), AddressBookError> {
        self.with_locked_user(user_id, |user| {
            let changes = user.delete_address(address_id)?;
            Ok(((), changes))
        })
        .await?;

        info!("Address deleted");
        Ok(())
    }

    /// Resolve the name to show for a user.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::UserNotFound` if the user doesn't exist.
    pub async fn display_name(&self, user_id: UserId) -> Result<DisplayName, AddressBookError> {
        Ok(self.get_user(user_id).await?.resolve_display_name())
    }

    async fn with_locked_user<T>(
        &self,
        user_id: UserId,
        op: impl FnOnce(&mut User) -> Result<(T, Vec<AccountChange>), AddressBookError>,
    ) -> Result<T, AddressBookError> {
        let mut tx = self.pool.begin().await?;

        let mut user = users::lock_user(&mut tx, user_id)
            .await?
            .ok_or(AddressBookError::UserNotFound(user_id))?;

        let (value, changes) = op(&mut user)?;
        if !changes.is_empty() {
            users::apply_changes(&mut tx, user_id, &changes).await?;
        }

        tx.commit().await?;
        Ok(value)
    }
}

/// Normalize an incoming address and, for demo stores, mask personal fields.
#[must_use]
pub fn prepare_address(data: AddressData, obfuscate: bool) -> AddressData {
    let data = data.normalized();
    if obfuscate { data.obfuscated() } else { data }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> AddressData {
        AddressData {
            first_name: " Ada ".to_owned(),
            last_name: "Lovelace".to_owned(),
            street_address_1: "12 Main St".to_owned(),
            city: "London".to_owned(),
            country: "gb".to_owned(),
            ..AddressData::default()
        }
    }

    #[test]
    fn test_prepare_address_normalizes() {
        let prepared = prepare_address(address(), false);
        assert_eq!(prepared.first_name, "Ada");
        assert_eq!(prepared.country, "GB");
    }

    #[test]
    fn test_prepare_address_obfuscates_after_normalizing() {
        let prepared = prepare_address(address(), true);
        assert_eq!(prepared.first_name, "A..");
        assert_eq!(prepared.last_name, "L.......");
        assert_eq!(prepared.city, "London");
        assert_eq!(prepared.country, "GB");
    }

    #[test]
    fn test_prepared_addresses_deduplicate() {
        // Obfuscation is deterministic, so the same input maps to one entry.
        let mut user = User::new(UserId::new(1));
        let first = user.store_address(prepare_address(address(), true), AddressType::Billing);
        let second = user.store_address(prepare_address(address(), true), AddressType::Billing);
        assert_eq!(first.address_id, second.address_id);
    }
}
