//! Storekeep Admin library.
//!
//! Staff-side management of discounts: vouchers and sales, their lifecycle
//! and the catalogue entities they apply to.
//!
//! Admin data lives in its own `admin` schema, separate from storefront
//! customer data.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod services;
