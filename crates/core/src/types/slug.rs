//! URL slugs for categories and products.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing usable was left after normalization.
    #[error("slug cannot be empty")]
    Empty,
    /// Longer than [`Slug::MAX_LENGTH`] characters.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains characters outside lower-case letters, digits and `-`.
    #[error("slug may contain only lower-case letters, digits and hyphens")]
    InvalidCharacter,
}

/// A URL-safe identifier.
///
/// Letters may be any Unicode alphabet (catalog names are often Cyrillic),
/// but must be lower-case. Words are separated by single hyphens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length in characters.
    pub const MAX_LENGTH: usize = 200;

    /// Parse an already-formed slug.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] if the value is empty, too long or not in slug form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let well_formed = s
            .chars()
            .all(|c| c == '-' || (c.is_alphanumeric() && !c.is_uppercase()))
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--");
        if !well_formed {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a display name.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if the name has no letters or digits.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        Self::parse(&slugify(name))
    }

    /// The slug with a numeric suffix, used to resolve collisions
    /// (`boots` → `boots-2`).
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lower-case a name and collapse everything that isn't a letter or digit
/// into single hyphens, truncated to [`Slug::MAX_LENGTH`].
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    out.chars()
        .take(Slug::MAX_LENGTH)
        .collect::<String>()
        .trim_end_matches('-')
        .to_owned()
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}
