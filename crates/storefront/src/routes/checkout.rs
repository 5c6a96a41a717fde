//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{ContactInput, OrderDetail};
use crate::services::CheckoutService;
use crate::state::AppState;

/// Turn the current cart into an order.
///
/// Responds `201 Created` with the order and its items; the cart is empty
/// afterwards. Nothing is written when the checkout is refused.
#[instrument(skip(state, session, auth, input))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    add_breadcrumb("checkout", "Place order", None);

    let order = CheckoutService::new(state.pool())
        .place_order(auth.cart_owner(&session), &input)
        .await?;

    tracing::info!(
        order_id = %order.order.id,
        total = %order.order.total_amount,
        guest = auth.0.is_none(),
        "order placed"
    );

    Ok((StatusCode::CREATED, Json(order)))
}
