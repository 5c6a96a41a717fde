//! Customer username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// Shorter than [`Username::MIN_LENGTH`] or longer than [`Username::MAX_LENGTH`].
    #[error("username must be between 3 and 30 characters")]
    Length,
    /// Contains a character other than ASCII letters, digits or underscore.
    #[error("username may contain only letters, digits and underscore")]
    InvalidCharacter,
}

/// A public username, unique per customer.
///
/// Allowed alphabet: `[a-zA-Z0-9_]`, 3 to 30 characters. Case is preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Minimum username length.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum username length.
    pub const MAX_LENGTH: usize = 30;

    /// Parse a `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`UsernameError`] if the length or alphabet rules are broken.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let s = s.trim();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&s.len()) {
            return Err(UsernameError::Length);
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(UsernameError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert_eq!(Username::parse("ivan_99").unwrap().as_str(), "ivan_99");
        assert!(Username::parse("abc").is_ok());
        assert!(Username::parse(&"x".repeat(30)).is_ok());
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(Username::parse("ab"), Err(UsernameError::Length));
        assert_eq!(Username::parse(&"x".repeat(31)), Err(UsernameError::Length));
    }

    #[test]
    fn test_rejects_other_characters() {
        assert_eq!(Username::parse("ivan-99"), Err(UsernameError::InvalidCharacter));
        assert_eq!(Username::parse("иван"), Err(UsernameError::InvalidCharacter));
        assert_eq!(Username::parse("a b c"), Err(UsernameError::InvalidCharacter));
    }
}
