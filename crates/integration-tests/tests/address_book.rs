//! Address book rules, exercised end to end through the core model.
//!
//! These tests need no database.

#![allow(clippy::unwrap_used)]

use storekeep_core::{AccountError, AddressData, AddressType, User, UserId};
use storekeep_integration_tests::address;
use storekeep_storefront::services::address_book::prepare_address;

fn user() -> User {
    User::new(UserId::new(1))
}

// =============================================================================
// Storing Addresses
// =============================================================================

#[test]
fn test_first_store_sets_default_and_repeat_is_idempotent() {
    let mut user = user();
    let a = address("12 Main St", "London");

    let first = user.store_address(a.clone(), AddressType::Billing);
    assert!(first.created);
    assert_eq!(user.default_billing_address(), Some(&a));

    let second = user.store_address(a.clone(), AddressType::Billing);
    assert!(!second.created);
    assert!(second.changes.is_empty());
    assert_eq!(second.address_id, first.address_id);
    assert_eq!(user.addresses().len(), 1);
    assert_eq!(user.default_address_id(AddressType::Billing), Some(first.address_id));
}

#[test]
fn test_one_entry_serves_both_defaults() {
    let mut user = user();
    let main_st = address("Main St", "X");

    let shipping = user.store_address(main_st.clone(), AddressType::Shipping);
    assert_eq!(user.default_shipping_address(), Some(&main_st));
    assert_eq!(user.default_billing_address(), None);

    let billing = user.store_address(main_st.clone(), AddressType::Billing);
    assert_eq!(billing.address_id, shipping.address_id);
    assert_eq!(user.addresses().len(), 1);
    assert_eq!(user.default_address_id(AddressType::Billing), Some(shipping.address_id));
    assert_eq!(user.default_address_id(AddressType::Shipping), Some(shipping.address_id));
}

#[test]
fn test_store_does_not_replace_existing_default() {
    let mut user = user();
    let home = address("1 Home Rd", "Leeds");
    let work = address("2 Work St", "York");

    user.store_address(home.clone(), AddressType::Billing);
    user.store_address(work, AddressType::Billing);

    assert_eq!(user.addresses().len(), 2);
    assert_eq!(user.default_billing_address(), Some(&home));
}

#[test]
fn test_store_deduplicates_after_normalizing() {
    let mut user = user();
    let first = user.store_address(
        AddressData {
            country: "gb".to_owned(),
            ..address("  12 Main St ", "London")
        },
        AddressType::Billing,
    );
    let second = user.store_address(
        AddressData {
            country: "GB".to_owned(),
            ..address("12 Main St", "London ")
        },
        AddressType::Shipping,
    );

    assert_eq!(first.address_id, second.address_id);
    assert_eq!(user.addresses().len(), 1);
}

// =============================================================================
// Changing Defaults
// =============================================================================

#[test]
fn test_change_default_keeps_previous_in_book() {
    let mut user = user();
    let a1 = address("1 Old Rd", "Bath");
    let a2 = address("2 New Rd", "Bath");

    let old = user.store_address(a1.clone(), AddressType::Billing);
    let new = user.change_default_address(a2.clone(), AddressType::Billing);

    assert_eq!(user.default_billing_address(), Some(&a2));
    assert_eq!(user.address(old.address_id), Some(&a1));
    assert_ne!(user.default_address_id(AddressType::Billing), Some(old.address_id));
    assert_eq!(user.default_address_id(AddressType::Billing), Some(new.address_id));
}

#[test]
fn test_change_default_leaves_other_type_alone() {
    let mut user = user();
    let a1 = address("1 Old Rd", "Bath");
    user.store_address(a1.clone(), AddressType::Shipping);

    user.change_default_address(address("2 New Rd", "Bath"), AddressType::Billing);

    assert_eq!(user.default_shipping_address(), Some(&a1));
}

#[test]
fn test_set_default_with_foreign_address_is_rejected() {
    let mut owner = user();
    let foreign = owner
        .store_address(address("9 Far Rd", "Hull"), AddressType::Billing)
        .address_id;

    let mut other = User::new(UserId::new(2));
    let own = other
        .store_address(address("1 Near Rd", "Hull"), AddressType::Billing)
        .address_id;

    let err = other
        .set_default_address(foreign, AddressType::Shipping)
        .unwrap_err();
    assert!(matches!(err, AccountError::AddressNotInBook { .. }));
    assert_eq!(other.default_address_id(AddressType::Billing), Some(own));
    assert_eq!(other.default_address_id(AddressType::Shipping), None);
}

// =============================================================================
// Deleting Addresses
// =============================================================================

#[test]
fn test_delete_clears_both_defaults() {
    let mut user = user();
    let id = user
        .store_address(address("Main St", "X"), AddressType::Billing)
        .address_id;
    user.store_address(address("Main St", "X"), AddressType::Shipping);

    user.delete_address(id).unwrap();

    assert!(user.addresses().is_empty());
    assert_eq!(user.default_address_id(AddressType::Billing), None);
    assert_eq!(user.default_address_id(AddressType::Shipping), None);
}

// =============================================================================
// Display Name
// =============================================================================

#[test]
fn test_display_name_prefers_own_first_name() {
    let mut user = user().with_names("Ada", "");
    user.store_address(
        AddressData {
            first_name: "Augusta".to_owned(),
            last_name: "King".to_owned(),
            ..address("Main St", "X")
        },
        AddressType::Billing,
    );

    let name = user.resolve_display_name();
    assert_eq!(name.first_name.as_deref(), Some("Ada"));
    // Each part falls back independently.
    assert_eq!(name.last_name.as_deref(), Some("King"));
}

#[test]
fn test_display_name_falls_back_to_billing_address() {
    let mut user = user();
    user.store_address(
        AddressData {
            first_name: "Augusta".to_owned(),
            ..address("Main St", "X")
        },
        AddressType::Billing,
    );

    assert_eq!(user.resolve_display_name().first_name.as_deref(), Some("Augusta"));
}

#[test]
fn test_display_name_unset_without_names_or_billing_address() {
    let mut user = user();
    user.store_address(
        AddressData {
            first_name: "Shippy".to_owned(),
            ..address("Main St", "X")
        },
        AddressType::Shipping,
    );

    let name = user.resolve_display_name();
    assert_eq!(name.first_name, None);
    assert_eq!(name.full_name(), None);
}

// =============================================================================
// Demo Obfuscation
// =============================================================================

#[test]
fn test_obfuscation_keeps_location_fields() {
    let data = AddressData {
        first_name: "Ada".to_owned(),
        postal_code: "SW1A 1AA".to_owned(),
        country: "gb".to_owned(),
        phone: "+44 20 7946 0958".to_owned(),
        ..address("12 Main St", "London")
    };

    let prepared = prepare_address(data, true);
    assert_eq!(prepared.city, "London");
    assert_eq!(prepared.postal_code, "SW1A 1AA");
    assert_eq!(prepared.country, "GB");
    assert_ne!(prepared.first_name, "Ada");
    assert_eq!(prepare_address(prepared.clone(), true), prepared);
}
