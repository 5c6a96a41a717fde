//! Authentication service.
//!
//! Password registration and login. Passwords are hashed with Argon2id and
//! stored apart from the user row.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use voentorg_core::{Email, Phone, Username};

use crate::db::RepositoryError;
use crate::db::users::{EMAIL_CONSTRAINT, USERNAME_CONSTRAINT, UserRepository};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterInput {
    /// Validate every field except password strength.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<NewUser, AuthError> {
        let username = Username::parse(&self.username)?;
        let email = Email::parse(&self.email)?;
        let phone = Phone::parse_optional(self.phone.as_deref())?;

        if self.password != self.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(&self.password)?;

        Ok(NewUser {
            username,
            email,
            first_name: trimmed(self.first_name.as_deref()),
            last_name: trimmed(self.last_name.as_deref()),
            phone,
        })
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user. Their empty cart is created alongside.
    ///
    /// # Errors
    ///
    /// Returns a validation variant (`InvalidEmail`, `InvalidUsername`,
    /// `InvalidPhone`, `PasswordMismatch`, `WeakPassword`) for bad input.
    /// Returns `AuthError::UsernameTaken` / `AuthError::EmailTaken` on duplicates.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: &RegisterInput) -> Result<User, AuthError> {
        let new_user = input.validate()?;
        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create_with_password(&new_user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(constraint) if constraint == USERNAME_CONSTRAINT => {
                    AuthError::UsernameTaken
                }
                RepositoryError::Conflict(constraint) if constraint == EMAIL_CONSTRAINT => {
                    AuthError::EmailTaken
                }
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "password cannot be entirely numeric".to_owned(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> RegisterInput {
        RegisterInput {
            username: "ryadovoy_1".to_owned(),
            email: "Ryadovoy@Voentorg.ru".to_owned(),
            password: "kirza-boots-42".to_owned(),
            password_confirm: "kirza-boots-42".to_owned(),
            first_name: Some("  Ivan ".to_owned()),
            last_name: None,
            phone: Some("+7(999)123-45-67".to_owned()),
        }
    }

    #[test]
    fn test_validate_accepts_and_normalizes() {
        let new_user = input().validate().unwrap();
        assert_eq!(new_user.email.as_str(), "ryadovoy@voentorg.ru");
        assert_eq!(new_user.first_name, "Ivan");
        assert_eq!(new_user.last_name, "");
        assert!(new_user.phone.is_some());
    }

    #[test]
    fn test_validate_rejects_mismatched_passwords() {
        let mut bad = input();
        bad.password_confirm = "something-else".to_owned();
        assert!(matches!(bad.validate(), Err(AuthError::PasswordMismatch)));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut bad = input();
        bad.username = "no spaces".to_owned();
        assert!(matches!(bad.validate(), Err(AuthError::InvalidUsername(_))));

        let mut bad = input();
        bad.phone = Some("call me".to_owned());
        assert!(matches!(bad.validate(), Err(AuthError::InvalidPhone(_))));

        let mut bad = input();
        bad.email = "not-an-email".to_owned();
        assert!(matches!(bad.validate(), Err(AuthError::InvalidEmail(_))));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("kirza-boots-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("kirza-boots-42", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
