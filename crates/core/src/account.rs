//! Users and their address books.
//!
//! A [`User`] owns an [`AddressBook`] and two optional default pointers, one
//! per [`AddressType`]. A default pointer is an [`AddressId`] into the user's
//! own book, never a separate record, so it can't outlive the entry it names.
//!
//! Every mutating operation returns the list of [`AccountChange`]s it made.
//! The storage layer writes exactly those changes and nothing else.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::address::{Address, AddressData, AddressType};
use crate::types::{AddressId, UserId};

/// Errors raised by address book operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The address is not part of this user's address book.
    #[error("address {address_id} does not belong to user {user_id}")]
    AddressNotInBook {
        /// Owner of the address book.
        user_id: UserId,
        /// Address that was looked up.
        address_id: AddressId,
    },

    /// A default pointer loaded from storage names an address outside the book.
    #[error("default {address_type} address {address_id} of user {user_id} is not in the address book")]
    DanglingDefault {
        /// Owner of the address book.
        user_id: UserId,
        /// Which default pointer is broken.
        address_type: AddressType,
        /// Address the pointer names.
        address_id: AddressId,
    },
}

/// A single state change made by an address book operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum AccountChange {
    /// A new entry was added to the address book.
    AddressCreated(Address),
    /// An entry was removed from the address book.
    AddressDeleted {
        /// The removed address.
        address_id: AddressId,
    },
    /// A default pointer was set or cleared.
    DefaultAddressSet {
        /// Which default pointer changed.
        address_type: AddressType,
        /// New value of the pointer.
        address_id: Option<AddressId>,
    },
}

/// Result of storing an address in a user's book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAddress {
    /// The book entry holding the address (new or reused).
    pub address_id: AddressId,
    /// Whether a new entry was created.
    pub created: bool,
    /// Changes to persist.
    pub changes: Vec<AccountChange>,
}

/// First and last name resolved for display, each independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName {
    /// Resolved first name.
    pub first_name: Option<String>,
    /// Resolved last name.
    pub last_name: Option<String>,
}

impl DisplayName {
    /// Join both parts with a space, skipping whichever is missing.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        }
    }
}

/// A user's collection of addresses, deduplicated by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    entries: BTreeMap<AddressId, AddressData>,
    by_value: HashMap<AddressData, AddressId>,
}

impl AddressBook {
    /// Create an empty address book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an address book from stored records.
    ///
    /// If storage holds two records with the same value, both are kept but
    /// lookups by value resolve to the first one seen.
    #[must_use]
    pub fn from_addresses(addresses: impl IntoIterator<Item = Address>) -> Self {
        let mut book = Self::new();
        for Address { id, data } in addresses {
            book.by_value.entry(data.clone()).or_insert(id);
            book.entries.insert(id, data);
        }
        book
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` names an entry in this book.
    #[must_use]
    pub fn contains(&self, id: AddressId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: AddressId) -> Option<&AddressData> {
        self.entries.get(&id)
    }

    /// Look up the entry structurally equal to `data`.
    #[must_use]
    pub fn find(&self, data: &AddressData) -> Option<AddressId> {
        self.by_value.get(data).copied()
    }

    /// Iterate over all entries, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (AddressId, &AddressData)> {
        self.entries.iter().map(|(id, data)| (*id, data))
    }

    /// Return the entry equal to `data`, inserting it if absent.
    ///
    /// The second tuple element is `true` when a new entry was created.
    pub fn get_or_insert(&mut self, data: AddressData) -> (AddressId, bool) {
        if let Some(id) = self.find(&data) {
            return (id, false);
        }
        let id = AddressId::generate();
        self.by_value.insert(data.clone(), id);
        self.entries.insert(id, data);
        (id, true)
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, id: AddressId) -> Option<AddressData> {
        let data = self.entries.remove(&id)?;
        if self.by_value.get(&data) == Some(&id) {
            self.by_value.remove(&data);
            // Re-point the value index at a surviving duplicate, if any.
            if let Some((other, _)) = self.entries.iter().find(|(_, d)| **d == data) {
                self.by_value.insert(data.clone(), *other);
            }
        }
        Some(data)
    }
}

/// A customer account with its address book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// The user's own first name (may be empty).
    pub first_name: String,
    /// The user's own last name (may be empty).
    pub last_name: String,
    addresses: AddressBook,
    default_billing_address: Option<AddressId>,
    default_shipping_address: Option<AddressId>,
}

impl User {
    /// Create a user with no names, no addresses and no defaults.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            addresses: AddressBook::new(),
            default_billing_address: None,
            default_shipping_address: None,
        }
    }

    /// Set the user's own names.
    #[must_use]
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Reassemble a user from stored state.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::DanglingDefault`] if a default pointer names an
    /// address that is not in `addresses`.
    pub fn from_parts(
        id: UserId,
        first_name: String,
        last_name: String,
        addresses: AddressBook,
        default_billing_address: Option<AddressId>,
        default_shipping_address: Option<AddressId>,
    ) -> Result<Self, AccountError> {
        for (address_type, pointer) in [
            (AddressType::Billing, default_billing_address),
            (AddressType::Shipping, default_shipping_address),
        ] {
            if let Some(address_id) = pointer
                && !addresses.contains(address_id)
            {
                return Err(AccountError::DanglingDefault {
                    user_id: id,
                    address_type,
                    address_id,
                });
            }
        }

        Ok(Self {
            id,
            first_name,
            last_name,
            addresses,
            default_billing_address,
            default_shipping_address,
        })
    }

    /// The user's address book.
    #[must_use]
    pub const fn addresses(&self) -> &AddressBook {
        &self.addresses
    }

    /// Look up one of the user's addresses.
    #[must_use]
    pub fn address(&self, id: AddressId) -> Option<&AddressData> {
        self.addresses.get(id)
    }

    /// Id of the default address of the given type.
    #[must_use]
    pub const fn default_address_id(&self, address_type: AddressType) -> Option<AddressId> {
        match address_type {
            AddressType::Billing => self.default_billing_address,
            AddressType::Shipping => self.default_shipping_address,
        }
    }

    /// The default address of the given type.
    #[must_use]
    pub fn default_address(&self, address_type: AddressType) -> Option<&AddressData> {
        self.default_address_id(address_type)
            .and_then(|id| self.addresses.get(id))
    }

    /// The default billing address.
    #[must_use]
    pub fn default_billing_address(&self) -> Option<&AddressData> {
        self.default_address(AddressType::Billing)
    }

    /// The default shipping address.
    #[must_use]
    pub fn default_shipping_address(&self) -> Option<&AddressData> {
        self.default_address(AddressType::Shipping)
    }

    /// Add an address to the book and make it the default if none is set.
    ///
    /// A structurally identical entry is reused instead of duplicated. If the
    /// user already has a default of `address_type`, the default is left alone.
    pub fn store_address(&mut self, data: AddressData, address_type: AddressType) -> StoredAddress {
        let mut changes = Vec::new();
        let (address_id, created) = self.insert_address(data, &mut changes);

        if self.default_address_id(address_type).is_none() {
            self.install_default(address_type, address_id, &mut changes);
        }

        debug!(
            user_id = %self.id,
            %address_id,
            %address_type,
            created,
            "Stored address"
        );

        StoredAddress {
            address_id,
            created,
            changes,
        }
    }

    /// Point the default of `address_type` at an existing book entry.
    ///
    /// Setting the current default again changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::AddressNotInBook`] if `address_id` is not one of
    /// this user's addresses. The defaults are left untouched in that case.
    pub fn set_default_address(
        &mut self,
        address_id: AddressId,
        address_type: AddressType,
    ) -> Result<Vec<AccountChange>, AccountError> {
        self.ensure_owned(address_id)?;

        let mut changes = Vec::new();
        if self.default_address_id(address_type) != Some(address_id) {
            self.install_default(address_type, address_id, &mut changes);
        }
        Ok(changes)
    }

    /// Point the default billing address at an existing book entry.
    ///
    /// # Errors
    ///
    /// See [`User::set_default_address`].
    pub fn set_default_billing_address(
        &mut self,
        address_id: AddressId,
    ) -> Result<Vec<AccountChange>, AccountError> {
        self.set_default_address(address_id, AddressType::Billing)
    }

    /// Point the default shipping address at an existing book entry.
    ///
    /// # Errors
    ///
    /// See [`User::set_default_address`].
    pub fn set_default_shipping_address(
        &mut self,
        address_id: AddressId,
    ) -> Result<Vec<AccountChange>, AccountError> {
        self.set_default_address(address_id, AddressType::Shipping)
    }

    /// Replace the default of `address_type` with a new address.
    ///
    /// The previous default stays in the book as an ordinary entry. The new
    /// address is added to the book (or matched to an existing entry) and
    /// becomes the default.
    pub fn change_default_address(
        &mut self,
        data: AddressData,
        address_type: AddressType,
    ) -> StoredAddress {
        let previous = self.default_address_id(address_type);
        let mut changes = Vec::new();
        let (address_id, created) = self.insert_address(data, &mut changes);

        if previous != Some(address_id) {
            self.install_default(address_type, address_id, &mut changes);
        }

        debug!(
            user_id = %self.id,
            %address_id,
            previous = ?previous,
            %address_type,
            "Changed default address"
        );

        StoredAddress {
            address_id,
            created,
            changes,
        }
    }

    /// Remove an address from the book, clearing any default that names it.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::AddressNotInBook`] if `address_id` is not one of
    /// this user's addresses.
    pub fn delete_address(&mut self, address_id: AddressId) -> Result<Vec<AccountChange>, AccountError> {
        self.ensure_owned(address_id)?;

        let mut changes = Vec::new();
        for address_type in AddressType::ALL {
            if self.default_address_id(address_type) == Some(address_id) {
                *self.default_slot_mut(address_type) = None;
                changes.push(AccountChange::DefaultAddressSet {
                    address_type,
                    address_id: None,
                });
            }
        }

        self.addresses.remove(address_id);
        changes.push(AccountChange::AddressDeleted { address_id });

        debug!(user_id = %self.id, %address_id, "Deleted address");
        Ok(changes)
    }

    /// Resolve the name to show for this user.
    ///
    /// Each part falls back on its own: the user's own name if non-empty,
    /// otherwise the matching field of the default billing address if
    /// non-empty, otherwise `None`. The first name may therefore come from the
    /// user while the last name comes from the address.
    #[must_use]
    pub fn resolve_display_name(&self) -> DisplayName {
        let billing = self.default_billing_address();
        DisplayName {
            first_name: name_with_fallback(&self.first_name, billing.map(|a| a.first_name.as_str())),
            last_name: name_with_fallback(&self.last_name, billing.map(|a| a.last_name.as_str())),
        }
    }

    fn ensure_owned(&self, address_id: AddressId) -> Result<(), AccountError> {
        if self.addresses.contains(address_id) {
            Ok(())
        } else {
            Err(AccountError::AddressNotInBook {
                user_id: self.id,
                address_id,
            })
        }
    }

    fn insert_address(
        &mut self,
        data: AddressData,
        changes: &mut Vec<AccountChange>,
    ) -> (AddressId, bool) {
        let data = data.normalized();
        let (address_id, created) = self.addresses.get_or_insert(data.clone());
        if created {
            changes.push(AccountChange::AddressCreated(Address::new(address_id, data)));
        }
        (address_id, created)
    }

    fn install_default(
        &mut self,
        address_type: AddressType,
        address_id: AddressId,
        changes: &mut Vec<AccountChange>,
    ) {
        *self.default_slot_mut(address_type) = Some(address_id);
        changes.push(AccountChange::DefaultAddressSet {
            address_type,
            address_id: Some(address_id),
        });
    }

    const fn default_slot_mut(&mut self, address_type: AddressType) -> &mut Option<AddressId> {
        match address_type {
            AddressType::Billing => &mut self.default_billing_address,
            AddressType::Shipping => &mut self.default_shipping_address,
        }
    }
}

fn name_with_fallback(own: &str, fallback: Option<&str>) -> Option<String> {
    if !own.is_empty() {
        return Some(own.to_owned());
    }
    fallback.filter(|name| !name.is_empty()).map(str::to_owned)
}
