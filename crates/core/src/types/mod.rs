//! Core types for Voentorg.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod slug;
pub mod status;
pub mod stock;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price};
pub use slug::{Slug, SlugError, slugify};
pub use status::{OrderStatus, StatusTransitionError};
pub use stock::{QuantityAdjustment, clamp_to_stock, merge_quantities, stock_from_db};
pub use username::{Username, UsernameError};
