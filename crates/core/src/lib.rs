//! Voentorg Core - Shared domain types.
//!
//! This crate provides the types used across all Voentorg components:
//! - `storefront` - Public-facing catalog, cart and checkout service
//! - `cli` - Command-line tools for migrations, seeding and order handling
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Stock clamping and order lifecycle rules live here so they
//! can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, contact data, slugs,
//!   order statuses and stock rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
