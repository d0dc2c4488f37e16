//! CLI command implementations.

pub mod discounts;
pub mod migrate;
pub mod users;
