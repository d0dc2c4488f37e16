//! Business logic services for storefront.
//!
//! # Services
//!
//! - `address_book` - Store addresses and manage default billing/shipping addresses

pub mod address_book;

pub use address_book::{AddressBookError, AddressBookService};
