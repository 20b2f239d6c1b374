//! Persistence for the store directory.
//!
//! # Database: `delicious`
//!
//! ## Tables (schema `directory`)
//!
//! - `user` - Registered users and their password hashes
//! - `store` - Store listings (slug, tags, location, photo, author)
//! - `review` - Reviews, linked to a store by `store_id`
//! - `user_heart` - Set of (user, store) favorites
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Ports
//!
//! Handlers never talk to `sqlx` directly. They receive the repository
//! traits below through [`Repos`], which is built once at startup and
//! injected via `AppState`. Two adapters exist:
//!
//! - `Pg*Repository` - `PostgreSQL`, used by the binary
//! - [`memory::MemoryDatabase`] - in-process, used by tests (`test-utils`)
//!
//! Every store read attaches the store's reviews before returning, and every
//! store insert (or rename) derives its slug. Both are explicit steps inside
//! the adapters' methods.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p delicious-cli -- migrate
//! ```

pub mod reviews;
pub mod stores;
pub mod users;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use delicious_core::{Email, StoreId, UserId};

use crate::models::{
    NewReview, NewStore, NewUser, Review, ScoredStore, Store, StoreFields, TagCount, TopStore,
    User,
};

pub use reviews::PgReviewRepository;
pub use stores::PgStoreRepository;
pub use users::PgUserRepository;

/// Errors returned by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Store persistence and the queries built on top of it.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Insert a store, deriving and de-duplicating its slug.
    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError>;

    /// Replace a store's editable fields, re-deriving the slug if the name
    /// changed. `fields.photo == None` keeps the current photo.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the store doesn't exist.
    async fn update(&self, id: StoreId, fields: &StoreFields) -> Result<Store, RepositoryError>;

    /// All stores in insertion order.
    async fn find_all(&self) -> Result<Vec<Store>, RepositoryError>;

    /// A single store by ID.
    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// A single store by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError>;

    /// Stores carrying `tag`, or every store when `tag` is `None`.
    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError>;

    /// Stores whose ID is in `ids`.
    async fn find_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError>;

    /// Tag frequencies, most used first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError>;

    /// Best-rated stores with at least two reviews.
    async fn top_stores(&self, limit: usize) -> Result<Vec<TopStore>, RepositoryError>;

    /// Full-text search over name and description, best match first.
    async fn search(&self, query: &str, limit: usize)
    -> Result<Vec<ScoredStore>, RepositoryError>;

    /// Cheap connectivity check for the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// User persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user.
    ///
    /// Returns `Err(RepositoryError::Conflict)` if the email is taken.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user and their password hash by (normalized) email.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Add `store` to the user's hearts; a no-op if already present.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the user or store doesn't exist.
    async fn add_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError>;

    /// Remove `store` from the user's hearts; a no-op if absent.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the user doesn't exist.
    async fn remove_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError>;
}

/// Review persistence.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Create a review.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the store doesn't exist.
    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError>;

    /// Reviews of one store, newest first.
    async fn list_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError>;
}

/// Container for all repository trait objects.
///
/// Cloning is cheap; every field is an `Arc`.
#[derive(Clone)]
pub struct Repos {
    pub stores: Arc<dyn StoreRepository>,
    pub users: Arc<dyn UserRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
}

impl Repos {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            stores: Arc::new(PgStoreRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            reviews: Arc::new(PgReviewRepository::new(pool.clone())),
        }
    }

    /// Repositories sharing one fresh in-memory database.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn in_memory() -> Self {
        let db = Arc::new(memory::MemoryDatabase::default());
        Self {
            stores: db.clone(),
            users: db.clone(),
            reviews: db,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique and foreign-key violations to domain errors.
fn map_constraint_error(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(e)
}
