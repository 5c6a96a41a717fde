//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voentorg_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// A placed order. Only `status` (and `updated_at`) change after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest orders.
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub status_name: &'static str,
    pub total_amount: Price,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub shipping_address: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of a placed order with the price and name at purchase time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    pub subtotal: Price,
}

/// An order together with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetail {
    /// Sum of item quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Contact details submitted at checkout. Every field is optional; see
/// `services::checkout::ResolvedContact::resolve` for defaults and validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}
