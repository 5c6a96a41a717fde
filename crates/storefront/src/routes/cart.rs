//! Cart route handlers.
//!
//! Guests get a cart kept in their session; logged-in users get their
//! persisted cart. Every mutation answers with the cart as it is afterwards.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use voentorg_core::ProductId;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::CartView;
use crate::services::CartService;
use crate::state::AppState;

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Set-quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove-line request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

/// Remove-line response.
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
    pub cart: CartView,
}

/// Show the current cart.
#[instrument(skip(state, session, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .view(auth.cart_owner(&session))
        .await?;
    Ok(Json(cart))
}

/// Add units of a product, clamped to stock.
#[instrument(skip(state, session, auth))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let product_id = request.product_id.to_string();
    add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product_id.as_str())]));

    let cart = CartService::new(state.pool())
        .add(auth.cart_owner(&session), request.product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// Set the quantity of a line; zero removes it.
#[instrument(skip(state, session, auth))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .update(auth.cart_owner(&session), request.product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a line.
#[instrument(skip(state, session, auth))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<RemoveResponse>> {
    let (removed, cart) = CartService::new(state.pool())
        .remove(auth.cart_owner(&session), request.product_id)
        .await?;
    Ok(Json(RemoveResponse { removed, cart }))
}

/// Empty the cart.
#[instrument(skip(state, session, auth))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .clear(auth.cart_owner(&session))
        .await?;
    Ok(Json(cart))
}
