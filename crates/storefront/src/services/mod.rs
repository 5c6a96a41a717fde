//! Business logic services.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;

pub use auth::{AuthError, AuthService, RegisterInput};
pub use cart::{CartError, CartOwner, CartService};
pub use checkout::{CheckoutError, CheckoutService};
pub use orders::{Actor, OrderError, OrderService};
