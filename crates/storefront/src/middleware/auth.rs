//! Authentication extractors.
//!
//! The logged-in user is a [`CurrentUser`] stored in the session under
//! `session_keys::CURRENT_USER`.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::services::CartOwner;

/// Extractor that requires a logged-in user.
///
/// Rejects with `401 Unauthorized` and a JSON error body otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("Login required".to_string());

        // Set by SessionManagerLayer
        let session = parts.extensions.get::<Session>().ok_or_else(unauthorized)?;

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await?
            .ok_or_else(unauthorized)?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this never rejects the request.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl OptionalAuth {
    /// The cart this request acts on: the user's persisted cart when logged
    /// in, otherwise the guest cart in `session`.
    #[must_use]
    pub fn cart_owner<'s>(&self, session: &'s Session) -> CartOwner<'s> {
        match &self.0 {
            Some(user) => CartOwner::User(user.id),
            None => CartOwner::Guest(session),
        }
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the logged-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
