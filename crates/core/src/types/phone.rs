//! Contact phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Outside the 7-20 character range.
    #[error("phone number must be between 7 and 20 characters")]
    Length,
    /// Contains something other than digits and `+()-`.
    #[error("phone number may contain only digits and the characters +()-")]
    InvalidCharacter,
}

/// A contact phone number as typed by the customer.
///
/// No normalization beyond trimming: the format is checked, not rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Minimum phone length.
    pub const MIN_LENGTH: usize = 7;
    /// Maximum phone length.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError`] if the length or alphabet rules are broken.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&s.len()) {
            return Err(PhoneError::Length);
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'(' | b')' | b'-'))
        {
            return Err(PhoneError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Parse an optional form field, treating blank input as absent.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError`] if a non-blank value is invalid.
    pub fn parse_optional(s: Option<&str>) -> Result<Option<Self>, PhoneError> {
        match s.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => Self::parse(value).map(Some),
        }
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}
