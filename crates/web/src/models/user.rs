//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Email, StoreId, UserId};

/// A registered user (domain type).
///
/// The password hash never leaves the repository layer, so this type is safe
/// to serialize into API responses.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name (already sanitized at registration).
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// Stores this user has hearted, in the order they were hearted.
    pub hearts: Vec<StoreId>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the user has hearted `store`.
    #[must_use]
    pub fn has_hearted(&self, store: StoreId) -> bool {
        self.hearts.contains(&store)
    }
}

/// A user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
}
