//! Address book persistence against a live `PostgreSQL`.
//!
//! Run with: `cargo test -p storekeep-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use storekeep_core::{AddressType, UserId};
use storekeep_integration_tests::{address, storefront_pool};
use storekeep_storefront::db::UserRepository;
use storekeep_storefront::services::{AddressBookError, AddressBookService};

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_store_and_reload_shared_entry() {
    let pool = storefront_pool().await.unwrap();
    let user = UserRepository::new(&pool).create("", "").await.unwrap();
    let service = AddressBookService::new(&pool, false);

    let shipping = service
        .store_address(user.id, address("Main St", "X"), AddressType::Shipping)
        .await
        .unwrap();
    let billing = service
        .store_address(user.id, address("Main St", "X"), AddressType::Billing)
        .await
        .unwrap();
    assert_eq!(shipping, billing);

    let reloaded = service.get_user(user.id).await.unwrap();
    assert_eq!(reloaded.addresses().len(), 1);
    assert_eq!(reloaded.default_address_id(AddressType::Billing), Some(billing));
    assert_eq!(reloaded.default_address_id(AddressType::Shipping), Some(billing));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_change_default_then_delete() {
    let pool = storefront_pool().await.unwrap();
    let user = UserRepository::new(&pool).create("Ada", "").await.unwrap();
    let service = AddressBookService::new(&pool, false);

    let old = service
        .store_address(user.id, address("1 Old Rd", "Bath"), AddressType::Billing)
        .await
        .unwrap();
    let new = service
        .change_default_address(user.id, address("2 New Rd", "Bath"), AddressType::Billing)
        .await
        .unwrap();

    let reloaded = service.get_user(user.id).await.unwrap();
    assert_eq!(reloaded.addresses().len(), 2);
    assert!(reloaded.addresses().contains(old));
    assert_eq!(reloaded.default_address_id(AddressType::Billing), Some(new));

    service.delete_address(user.id, new).await.unwrap();
    let reloaded = service.get_user(user.id).await.unwrap();
    assert_eq!(reloaded.addresses().len(), 1);
    assert_eq!(reloaded.default_address_id(AddressType::Billing), None);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_foreign_address_cannot_become_default() {
    let pool = storefront_pool().await.unwrap();
    let users = UserRepository::new(&pool);
    let owner = users.create("", "").await.unwrap();
    let other = users.create("", "").await.unwrap();
    let service = AddressBookService::new(&pool, false);

    let foreign = service
        .store_address(owner.id, address("9 Far Rd", "Hull"), AddressType::Billing)
        .await
        .unwrap();

    let err = service
        .set_default_address(other.id, foreign, AddressType::Billing)
        .await
        .unwrap_err();
    assert!(matches!(err, AddressBookError::Account(_)));

    let reloaded = service.get_user(other.id).await.unwrap();
    assert_eq!(reloaded.default_address_id(AddressType::Billing), None);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_display_name_from_billing_address() {
    let pool = storefront_pool().await.unwrap();
    let user = UserRepository::new(&pool).create("", "Lovelace").await.unwrap();
    let service = AddressBookService::new(&pool, false);

    let mut data = address("12 Main St", "London");
    data.first_name = "Ada".to_owned();
    service
        .store_address(user.id, data, AddressType::Billing)
        .await
        .unwrap();

    let name = service.display_name(user.id).await.unwrap();
    assert_eq!(name.full_name().as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_missing_user() {
    let pool = storefront_pool().await.unwrap();
    let service = AddressBookService::new(&pool, false);

    let err = service.get_user(UserId::new(i32::MAX)).await.unwrap_err();
    assert!(matches!(err, AddressBookError::UserNotFound(_)));
}
