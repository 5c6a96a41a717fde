//! Customer account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use voentorg_core::{Email, Phone, UserId, Username};

/// A registered customer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    /// Login identifier.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<Phone>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the username when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.as_str().to_owned()
        } else {
            full.to_owned()
        }
    }
}

/// Validated registration data, ready to insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<Phone>,
}
