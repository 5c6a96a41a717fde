//! Authentication route handlers.
//!
//! Registration and login both cycle the session ID, merge the guest cart
//! into the account cart and store the user in the session.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::set_current_user;
use crate::models::{CartView, CurrentUser, User};
use crate::services::{AuthService, CartService, RegisterInput};
use crate::state::AppState;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response to a successful login or registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub cart: CartView,
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// Create an account and log it in.
#[instrument(skip(state, session, input), fields(username = %input.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<RegisterInput>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool()).register(&input).await?;
    tracing::info!(user_id = %user.id, "account registered");

    let cart = start_session(&state, &session, &user).await?;
    Ok(Json(AuthResponse { user, cart }))
}

/// Log in with email and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await?;
    tracing::info!(user_id = %user.id, "user logged in");

    let cart = start_session(&state, &session, &user).await?;
    Ok(Json(AuthResponse { user, cart }))
}

/// Log out by deleting the whole session. The guest cart does not come back.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<LogoutResponse>> {
    session.flush().await?;
    clear_sentry_user();

    Ok(Json(LogoutResponse { logged_out: true }))
}

/// Cycle the session ID, merge the guest cart and remember the user.
async fn start_session(state: &AppState, session: &Session, user: &User) -> Result<CartView> {
    session.cycle_id().await?;

    let cart = CartService::new(state.pool())
        .merge_session_cart(session, user.id)
        .await?;

    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(cart)
}
