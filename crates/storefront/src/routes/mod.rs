//! HTTP route handlers for the storefront.
//!
//! Every handler answers with JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Home (featured products + categories)
//! GET  /search?q=                  - Product name search
//! GET  /order-statuses             - Order status registry
//!
//! # Catalog
//! GET  /products                   - Product listing (?category=&q=&sort=&page=&per_page=)
//! GET  /products/{slug}            - Product detail
//! GET  /categories                 - Category list with full paths
//! GET  /categories/{slug}          - Category detail + products
//!
//! # Cart (session cart for guests, persisted cart for users)
//! GET  /cart                       - Current cart
//! POST /cart/add                   - Add units of a product
//! POST /cart/update                - Set a line's quantity
//! POST /cart/remove                - Remove a line
//! POST /cart/clear                 - Empty the cart
//!
//! # Checkout
//! POST /checkout                   - Place an order from the cart
//!
//! # Auth
//! POST /auth/register              - Create an account and log in
//! POST /auth/login                 - Log in
//! POST /auth/logout                - Log out
//!
//! # Account (requires auth)
//! GET  /account                    - Profile + recent orders
//! GET  /account/orders             - Order history
//! GET  /account/orders/{id}        - Order detail
//! POST /account/orders/{id}/cancel - Cancel a new order
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::products))
        .route("/{slug}", get(catalog::product))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::categories))
        .route("/{slug}", get(catalog::category))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel_order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/search", get(catalog::search))
        .route("/order-statuses", get(catalog::order_statuses))
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place_order))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
