//! Domain models for the storefront.
//!
//! These are validated domain objects; the `db` module maps rows into them.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartNotice, CartView, SessionCart, SessionCartLine};
pub use catalog::{
    Category, CategoryDetail, NewProductImage, Page, Product, ProductDetail, ProductImage,
    ProductQuery, ProductSort,
};
pub use order::{ContactInput, Order, OrderDetail, OrderItem};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
