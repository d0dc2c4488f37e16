//! Business logic services for admin.
//!
//! # Services
//!
//! - `discounts` - Voucher and sale lifecycle and catalogue scope

pub mod discounts;

pub use discounts::{DiscountService, DiscountServiceError};
