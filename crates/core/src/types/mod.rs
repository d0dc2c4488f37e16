//! Core types for Storekeep.
//!
//! This module provides type-safe wrappers for entity identifiers.

pub mod id;

pub use id::*;
