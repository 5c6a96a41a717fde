//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the request span)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is an extractor (`RequireAuth` / `OptionalAuth`), not a layer.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use request_id::{RequestId, request_id_middleware};
pub use session::create_session_layer;
