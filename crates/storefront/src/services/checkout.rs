//! Checkout: turn a cart into an order.
//!
//! [`CheckoutPlan::prepare`] validates and prices the cart against product
//! snapshots without touching the database. [`CheckoutService::place_order`]
//! runs it inside one transaction:
//!
//! 1. lock the customer's cart row (logged-in customers)
//! 2. lock the product rows in ID order (`SELECT … FOR UPDATE`)
//! 3. prepare the plan from the locked rows
//! 4. insert the order and its items
//! 5. decrement stock, guarded by `stock >= quantity`
//! 6. empty the cart
//!
//! Any failure rolls the whole transaction back.

use std::collections::{BTreeMap, HashMap};

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use voentorg_core::{Email, EmailError, OrderId, Phone, PhoneError, Price, ProductId, UserId};

use crate::db::users::UserRepository;
use crate::db::{RepositoryError, carts, orders};
use crate::models::cart::SessionCart;
use crate::models::order::{ContactInput, OrderDetail};
use crate::models::session::keys;
use crate::models::user::User;
use crate::services::cart::{CartOwner, load_session_cart};

/// Errors that abort a checkout. Nothing is written when one is returned.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line points at a product that no longer exists.
    #[error("product {0} no longer exists")]
    ProductMissing(ProductId),

    /// A product was withdrawn from sale.
    #[error("{name} is no longer available")]
    Unavailable { name: String },

    /// Not enough units left.
    #[error("only {available} of {name} left, {requested} requested")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },

    /// Stock moved between validation and decrement.
    #[error("stock of {name} changed during checkout")]
    StockChanged { name: String },

    /// Guests must leave an email address.
    #[error("contact email is required")]
    MissingEmail,

    /// Contact email is malformed.
    #[error("invalid contact email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Contact phone is malformed.
    #[error("invalid contact phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// State of a product at checkout time.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub is_available: bool,
}

/// A cart line to be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A validated, priced order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    /// `price × quantity`.
    pub subtotal: Price,
}

/// A validated order, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    /// One item per product, in product ID order.
    pub items: Vec<PlannedItem>,
    /// Sum of item subtotals.
    pub total: Price,
}

impl CheckoutPlan {
    /// Validate `lines` against `products` and price them.
    ///
    /// Lines for the same product are combined; zero-quantity lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `ProductMissing`, `Unavailable` or
    /// `InsufficientStock` for the first offending line in product ID order.
    pub fn prepare(
        lines: &[RequestedLine],
        products: &[ProductSnapshot],
    ) -> Result<Self, CheckoutError> {
        let mut wanted: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in lines.iter().filter(|l| l.quantity > 0) {
            let entry = wanted.entry(line.product_id).or_insert(0);
            *entry = entry.saturating_add(line.quantity);
        }
        if wanted.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let by_id: HashMap<ProductId, &ProductSnapshot> =
            products.iter().map(|p| (p.id, p)).collect();

        let mut items = Vec::with_capacity(wanted.len());
        for (product_id, quantity) in wanted {
            let product = by_id
                .get(&product_id)
                .ok_or(CheckoutError::ProductMissing(product_id))?;

            if !product.is_available {
                return Err(CheckoutError::Unavailable {
                    name: product.name.clone(),
                });
            }
            if product.stock < quantity {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name.clone(),
                    requested: quantity,
                    available: product.stock,
                });
            }

            items.push(PlannedItem {
                product_id,
                product_name: product.name.clone(),
                quantity,
                price: product.price,
                subtotal: product.price.times(quantity),
            });
        }

        let total = items.iter().map(|i| i.subtotal).sum();
        Ok(Self { items, total })
    }

    /// Total number of units.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Contact details stored on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContact {
    pub email: Email,
    pub phone: Option<Phone>,
    pub shipping_address: String,
    pub notes: String,
}

impl ResolvedContact {
    /// Validate submitted contact details, filling email and phone from the
    /// customer's profile when left blank.
    ///
    /// # Errors
    ///
    /// Returns `MissingEmail` for a guest without an email, or
    /// `InvalidEmail`/`InvalidPhone` for malformed values.
    pub fn resolve(input: &ContactInput, profile: Option<&User>) -> Result<Self, CheckoutError> {
        let email = match non_blank(input.contact_email.as_deref()) {
            Some(raw) => Email::parse(raw)?,
            None => profile
                .map(|u| u.email.clone())
                .ok_or(CheckoutError::MissingEmail)?,
        };

        let phone = match Phone::parse_optional(input.contact_phone.as_deref())? {
            Some(phone) => Some(phone),
            None => profile.and_then(|u| u.phone.clone()),
        };

        Ok(Self {
            email,
            phone,
            shipping_address: non_blank(input.shipping_address.as_deref())
                .unwrap_or_default()
                .to_owned(),
            notes: non_blank(input.notes.as_deref())
                .unwrap_or_default()
                .to_owned(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the owner's cart and empty the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`]; no order is written and no stock changes
    /// when it does.
    #[instrument(skip(self, owner, input))]
    pub async fn place_order(
        &self,
        owner: CartOwner<'_>,
        input: &ContactInput,
    ) -> Result<OrderDetail, CheckoutError> {
        match owner {
            CartOwner::Guest(session) => {
                let cart = load_session_cart(session).await?;
                let contact = ResolvedContact::resolve(input, None)?;
                let lines: Vec<RequestedLine> = cart
                    .lines()
                    .iter()
                    .map(|l| RequestedLine {
                        product_id: l.product_id,
                        quantity: l.quantity,
                    })
                    .collect();

                let mut tx = self.pool.begin().await?;
                let order = write_order(&mut tx, None, &lines, &contact).await?;
                tx.commit().await?;

                forget_session_cart(session, order.order.id).await;
                Ok(order)
            }
            CartOwner::User(user_id) => {
                let profile = UserRepository::new(self.pool)
                    .get_by_id(user_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                let contact = ResolvedContact::resolve(input, Some(&profile))?;

                let mut tx = self.pool.begin().await?;
                let cart_id = carts::lock_or_create(&mut tx, user_id).await?;
                let lines: Vec<RequestedLine> = carts::lines(&mut tx, cart_id)
                    .await?
                    .into_iter()
                    .map(|l| RequestedLine {
                        product_id: l.product_id,
                        quantity: l.quantity,
                    })
                    .collect();

                let order = write_order(&mut tx, Some(user_id), &lines, &contact).await?;
                carts::clear(&mut tx, cart_id).await?;
                tx.commit().await?;
                Ok(order)
            }
        }
    }
}

/// Drop the guest cart after its order is committed.
///
/// The order already stands, so a session failure is logged, not returned.
async fn forget_session_cart(session: &Session, order_id: OrderId) {
    if let Err(err) = session.remove::<SessionCart>(keys::CART).await {
        tracing::warn!(%order_id, error = %err, "order placed but guest cart not cleared");
    }
}

/// Steps 2–5 of a checkout, on an open transaction.
async fn write_order(
    conn: &mut sqlx::PgConnection,
    user_id: Option<UserId>,
    lines: &[RequestedLine],
    contact: &ResolvedContact,
) -> Result<OrderDetail, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    let snapshots = orders::lock_products(&mut *conn, &ids).await?;
    let plan = CheckoutPlan::prepare(lines, &snapshots)?;

    let order_id = orders::insert_order(&mut *conn, user_id, plan.total, contact).await?;
    for item in &plan.items {
        orders::insert_item(&mut *conn, order_id, item).await?;
        if !orders::decrement_stock(&mut *conn, item.product_id, item.quantity).await? {
            return Err(CheckoutError::StockChanged {
                name: item.product_name.clone(),
            });
        }
    }

    tracing::info!(
        %order_id,
        items = plan.total_items(),
        total = %plan.total,
        "order placed"
    );

    orders::detail(conn, order_id)
        .await?
        .ok_or(CheckoutError::Repository(RepositoryError::NotFound))
}
