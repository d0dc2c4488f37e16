//! Storekeep Core - Domain library.
//!
//! This crate provides the domain model shared by all Storekeep components:
//! - `storefront` - Customer accounts and address books
//! - `admin` - Staff management of vouchers and sales
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and in-memory state transitions - no I/O,
//! no database access. Every mutating operation returns a description of what
//! changed, and the calling layer decides how to persist it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs
//! - [`address`] - Address value records and address types
//! - [`account`] - Users and their address books
//! - [`discount`] - Vouchers, sales, and their catalogue scope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod address;
pub mod discount;
pub mod types;

pub use account::{AccountChange, AccountError, AddressBook, DisplayName, StoredAddress, User};
pub use address::{Address, AddressData, AddressType, AddressTypeError};
pub use discount::{
    CatalogueInput, CatalogueScope, CatalogueScoped, DiscountError, DiscountValueType, NewSale,
    NewVoucher, Sale, SaleInput, SaleUpdate, ScopeDelta, ScopeOp, Voucher, VoucherCode,
    VoucherInput, VoucherType, VoucherUpdate,
};
pub use types::*;
