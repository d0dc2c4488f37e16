//! Storekeep Storefront library.
//!
//! Customer-side persistence: users and their address books stored in
//! `PostgreSQL`. The address book rules themselves live in `storekeep-core`;
//! this crate loads a user, runs the core operation, and writes back exactly
//! the changes it reports.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod services;
