//! Account route handlers.
//!
//! These routes require authentication.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use voentorg_core::{OrderId, OrderStatus};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail, User};
use crate::services::{Actor, OrderService};
use crate::state::AppState;

/// Account overview.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub recent_orders: Vec<Order>,
}

/// Profile and the most recent orders.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let recent_orders = OrderService::new(state.pool())
        .recent_for_user(current_user.id)
        .await?;

    Ok(Json(ProfileResponse {
        user,
        recent_orders,
    }))
}

/// Full order history, newest first.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool())
        .all_for_user(current_user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the user's orders with its items.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderService::new(state.pool())
        .get_for_user(current_user.id, order_id)
        .await?;
    Ok(Json(order))
}

/// Cancel one of the user's orders while it is still new.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let id = order_id.to_string();
    add_breadcrumb("order", "Cancel order", Some(&[("order_id", id.as_str())]));

    let order = OrderService::new(state.pool())
        .change_status(
            Actor::Customer(current_user.id),
            order_id,
            OrderStatus::Cancelled,
        )
        .await?;
    Ok(Json(order))
}
