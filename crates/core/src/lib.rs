//! Delicious Core - Shared domain types.
//!
//! This crate provides the value types used across the Delicious workspace:
//! - `web` - The store directory server
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and their validation rules - no I/O,
//! no database access, no HTTP. This keeps it lightweight and allows it to
//! be used anywhere, including in pure unit tests.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, slugs, ratings and store locations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
