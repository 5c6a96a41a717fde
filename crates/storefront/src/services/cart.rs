//! Cart service.
//!
//! One set of operations over two stores: a [`SessionCart`] in the session for
//! guests, and `cart`/`cart_item` rows for logged-in customers. Every
//! quantity is clamped to stock; clamping shows up as a notice on the
//! returned [`CartView`], never as an error.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use voentorg_core::{
    ProductId, QuantityAdjustment, UserId, clamp_to_stock, merge_quantities,
};

use crate::db::catalog::{self, CatalogRepository};
use crate::db::{RepositoryError, carts};
use crate::models::cart::{CartLine, CartNotice, CartView, SessionCart};
use crate::models::catalog::Product;
use crate::models::session::keys;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// No product with this ID.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Whose cart an operation acts on.
#[derive(Clone, Copy)]
pub enum CartOwner<'s> {
    /// Guest cart stored in this session.
    Guest(&'s Session),
    /// Persisted cart of a logged-in customer.
    User(UserId),
}

/// Quantity to hold after adding `quantity` onto `existing` units of `product`.
fn plan_add(product: &Product, existing: u32, quantity: u32) -> QuantityAdjustment {
    if product.is_available {
        merge_quantities(existing, quantity, product.stock)
    } else {
        QuantityAdjustment::OutOfStock
    }
}

/// Quantity to hold after setting the line of `product` to `quantity` (≥ 1).
fn plan_set(product: &Product, quantity: u32) -> QuantityAdjustment {
    if product.is_available {
        clamp_to_stock(quantity, product.stock)
    } else {
        QuantityAdjustment::OutOfStock
    }
}

/// Load the guest cart from the session (empty if absent).
///
/// # Errors
///
/// Returns the session store error.
pub async fn load_session_cart(
    session: &Session,
) -> Result<SessionCart, tower_sessions::session::Error> {
    Ok(session
        .get::<SessionCart>(keys::CART)
        .await?
        .unwrap_or_default())
}

async fn save_session_cart(
    session: &Session,
    cart: &SessionCart,
) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<SessionCart>(keys::CART).await?;
        Ok(())
    } else {
        session.insert(keys::CART, cart).await
    }
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
    catalog: CatalogRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            catalog: CatalogRepository::new(pool),
        }
    }

    /// Current cart, priced from the live catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` or `CartError::Repository` on store failures.
    pub async fn view(&self, owner: CartOwner<'_>) -> Result<CartView, CartError> {
        match owner {
            CartOwner::Guest(session) => {
                let cart = load_session_cart(session).await?;
                self.price_session_cart(&cart).await
            }
            CartOwner::User(user_id) => {
                let mut conn = self.pool.acquire().await?;
                let lines = match carts::find(&mut conn, user_id).await? {
                    Some(cart_id) => carts::lines(&mut conn, cart_id).await?,
                    None => Vec::new(),
                };
                Ok(CartView::new(lines))
            }
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity and
    /// `CartError::ProductNotFound` for an unknown product.
    #[instrument(skip(self, owner))]
    pub async fn add(
        &self,
        owner: CartOwner<'_>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let adjustment = match owner {
            CartOwner::Guest(session) => {
                let product = self.require_product(product_id).await?;
                let mut cart = load_session_cart(session).await?;
                let adjustment = if product.is_available {
                    cart.add(product_id, quantity, product.stock)
                } else {
                    QuantityAdjustment::OutOfStock
                };
                if adjustment.quantity().is_some() {
                    save_session_cart(session, &cart).await?;
                }
                adjustment
            }
            CartOwner::User(user_id) => {
                let mut tx = self.pool.begin().await?;
                let cart_id = carts::lock_or_create(&mut tx, user_id).await?;
                let product = catalog::product_by_id(&mut tx, product_id)
                    .await?
                    .ok_or(CartError::ProductNotFound(product_id))?;
                let existing = carts::quantity_of(&mut tx, cart_id, product_id).await?;
                let adjustment = plan_add(&product, existing, quantity);
                if let Some(held) = adjustment.quantity() {
                    carts::set_quantity(&mut tx, cart_id, product_id, held).await?;
                }
                tx.commit().await?;
                adjustment
            }
        };

        if adjustment.is_reduced() {
            tracing::info!(%product_id, ?adjustment, "add to cart reduced by stock");
        }
        Ok(self.view(owner).await?.with_adjustment(product_id, adjustment))
    }

    /// Set a line to `quantity` units. Zero removes it; a product not in the
    /// cart is added.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for an unknown product.
    #[instrument(skip(self, owner))]
    pub async fn update(
        &self,
        owner: CartOwner<'_>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            let (_, view) = self.remove(owner, product_id).await?;
            return Ok(view);
        }

        let adjustment = match owner {
            CartOwner::Guest(session) => {
                let product = self.require_product(product_id).await?;
                let mut cart = load_session_cart(session).await?;
                let adjustment = if product.is_available {
                    cart.set(product_id, quantity, product.stock)
                } else {
                    QuantityAdjustment::OutOfStock
                };
                if adjustment.quantity().is_some() {
                    save_session_cart(session, &cart).await?;
                }
                adjustment
            }
            CartOwner::User(user_id) => {
                let mut tx = self.pool.begin().await?;
                let cart_id = carts::lock_or_create(&mut tx, user_id).await?;
                let product = catalog::product_by_id(&mut tx, product_id)
                    .await?
                    .ok_or(CartError::ProductNotFound(product_id))?;
                let adjustment = plan_set(&product, quantity);
                if let Some(held) = adjustment.quantity() {
                    carts::set_quantity(&mut tx, cart_id, product_id, held).await?;
                }
                tx.commit().await?;
                adjustment
            }
        };

        Ok(self.view(owner).await?.with_adjustment(product_id, adjustment))
    }

    /// Remove a line. Returns whether it was present, and the cart after.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` or `CartError::Repository` on store failures.
    #[instrument(skip(self, owner))]
    pub async fn remove(
        &self,
        owner: CartOwner<'_>,
        product_id: ProductId,
    ) -> Result<(bool, CartView), CartError> {
        let removed = match owner {
            CartOwner::Guest(session) => {
                let mut cart = load_session_cart(session).await?;
                let removed = cart.remove(product_id);
                if removed {
                    save_session_cart(session, &cart).await?;
                }
                removed
            }
            CartOwner::User(user_id) => {
                let mut tx = self.pool.begin().await?;
                let cart_id = carts::lock_or_create(&mut tx, user_id).await?;
                let removed = carts::remove_line(&mut tx, cart_id, product_id).await?;
                tx.commit().await?;
                removed
            }
        };

        Ok((removed, self.view(owner).await?))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` or `CartError::Repository` on store failures.
    #[instrument(skip(self, owner))]
    pub async fn clear(&self, owner: CartOwner<'_>) -> Result<CartView, CartError> {
        match owner {
            CartOwner::Guest(session) => {
                session.remove::<SessionCart>(keys::CART).await?;
            }
            CartOwner::User(user_id) => {
                let mut tx = self.pool.begin().await?;
                let cart_id = carts::lock_or_create(&mut tx, user_id).await?;
                carts::clear(&mut tx, cart_id).await?;
                tx.commit().await?;
            }
        }
        Ok(CartView::empty())
    }

    /// Move the guest cart of `session` into the persisted cart of `user_id`.
    ///
    /// Quantities are added onto existing lines and clamped to stock;
    /// unavailable or deleted products are skipped with an `out_of_stock`
    /// notice. The guest cart is taken out of the session before the merge,
    /// so a second call finds nothing to merge. If the database write fails
    /// the guest cart is put back.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` or `CartError::Repository` on store failures.
    #[instrument(skip(self, session))]
    pub async fn merge_session_cart(
        &self,
        session: &Session,
        user_id: UserId,
    ) -> Result<CartView, CartError> {
        let guest_cart = session
            .remove::<SessionCart>(keys::CART)
            .await?
            .unwrap_or_default();

        if guest_cart.is_empty() {
            return self.view(CartOwner::User(user_id)).await;
        }

        match self.merge_lines(user_id, &guest_cart).await {
            Ok(view) => {
                tracing::info!(
                    lines = guest_cart.lines().len(),
                    notices = view.notices.len(),
                    "guest cart merged"
                );
                Ok(view)
            }
            Err(e) => {
                if let Err(restore_err) = session.insert(keys::CART, &guest_cart).await {
                    tracing::warn!(error = %restore_err, "failed to restore guest cart after merge error");
                }
                Err(e)
            }
        }
    }

    async fn merge_lines(
        &self,
        user_id: UserId,
        guest_cart: &SessionCart,
    ) -> Result<CartView, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_or_create(&mut tx, user_id).await?;

        let mut notices = Vec::new();
        for line in guest_cart.lines() {
            let adjustment = match catalog::product_by_id(&mut tx, line.product_id).await? {
                Some(product) => {
                    let existing = carts::quantity_of(&mut tx, cart_id, line.product_id).await?;
                    plan_add(&product, existing, line.quantity)
                }
                None => QuantityAdjustment::OutOfStock,
            };
            if let Some(held) = adjustment.quantity().filter(|q| *q > 0) {
                carts::set_quantity(&mut tx, cart_id, line.product_id, held).await?;
            }
            notices.extend(CartNotice::from_adjustment(line.product_id, adjustment));
        }

        let lines = carts::lines(&mut tx, cart_id).await?;
        tx.commit().await?;

        let mut view = CartView::new(lines);
        view.notices = notices;
        Ok(view)
    }

    async fn require_product(&self, product_id: ProductId) -> Result<Product, CartError> {
        self.catalog
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))
    }

    /// Price a guest cart. Lines whose product no longer exists are dropped.
    async fn price_session_cart(&self, cart: &SessionCart) -> Result<CartView, CartError> {
        let products: HashMap<ProductId, Product> = self
            .catalog
            .get_products(&cart.product_ids())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let lines = cart
            .lines()
            .iter()
            .filter_map(|line| {
                products.get(&line.product_id).map(|p| {
                    CartLine::new(
                        p.id,
                        p.name.clone(),
                        p.slug.clone(),
                        p.price,
                        line.quantity,
                        p.stock,
                        p.is_available,
                    )
                })
            })
            .collect();

        Ok(CartView::new(lines))
    }
}
