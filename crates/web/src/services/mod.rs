//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `stores` - Store listings, hearts, reviews, top list and search
//!
//! Services borrow their repositories from `AppState` for the duration of a
//! request and never hold connections themselves.

pub mod auth;
pub mod stores;

pub use auth::{AuthError, AuthService, RegisterInput};
pub use stores::{StoreError, StoreService, UpdatedStore};
