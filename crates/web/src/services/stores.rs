//! Store directory service.
//!
//! Orchestrates validation, ownership checks and repository calls for the
//! store, heart and review routes.

use thiserror::Error;
use tracing::{info, instrument};

use delicious_core::{StoreId, UserId};

use crate::db::{Repos, RepositoryError};
use crate::models::{NewReview, Review, ScoredStore, Store, TagCount, TopStore, User};
use crate::validation::{
    StoreInput, ValidationErrors, validate_new_store, validate_review, validate_store,
};

/// Maximum number of stores on the top list.
pub const TOP_STORES_LIMIT: usize = 10;

/// Maximum number of search hits returned.
pub const SEARCH_RESULTS_LIMIT: usize = 5;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The submitted form has problems.
    #[error("invalid store: {0}")]
    Validation(#[from] ValidationErrors),

    /// Only the author may edit a store.
    #[error("You must own a store to edit it")]
    NotOwner,

    /// The store (or user) doesn't exist.
    #[error("store not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for StoreError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// A store after an edit.
#[derive(Debug)]
pub struct UpdatedStore {
    pub store: Store,
    /// The photo file the edit replaced, no longer referenced by the store.
    pub replaced_photo: Option<String>,
}

/// Store directory service.
pub struct StoreService<'a> {
    repos: &'a Repos,
}

impl<'a> StoreService<'a> {
    #[must_use]
    pub const fn new(repos: &'a Repos) -> Self {
        Self { repos }
    }

    /// Validate and save a new store authored by `author`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the form has problems.
    #[instrument(skip(self, input, photo), fields(name = %input.name))]
    pub async fn create_store(
        &self,
        author: UserId,
        input: &StoreInput,
        photo: Option<String>,
    ) -> Result<Store, StoreError> {
        let mut store = validate_new_store(input, Some(author))?;
        store.fields.photo = photo;

        let store = self.repos.stores.insert(&store).await?;
        info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// Load a store for editing by `user`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    /// Returns `StoreError::NotOwner` if `user` is not its author.
    pub async fn edit_store(&self, id: StoreId, user: UserId) -> Result<Store, StoreError> {
        let store = self
            .repos
            .stores
            .find_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        confirm_owner(&store, user)?;
        Ok(store)
    }

    /// Validate and apply an edit by `user`.
    ///
    /// Ownership is checked before the form is looked at. `photo == None`
    /// keeps the current photo.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound`, `StoreError::NotOwner` or
    /// `StoreError::Validation`.
    #[instrument(skip(self, input, photo))]
    pub async fn update_store(
        &self,
        id: StoreId,
        user: UserId,
        input: &StoreInput,
        photo: Option<String>,
    ) -> Result<UpdatedStore, StoreError> {
        let current = self.edit_store(id, user).await?;

        let mut fields = validate_store(input)?;
        fields.photo = photo;

        let store = self.repos.stores.update(id, &fields).await?;
        info!(store_id = %store.id, slug = %store.slug, "Store updated");

        let replaced_photo = current.photo.filter(|old| store.photo.as_ref() != Some(old));
        Ok(UpdatedStore {
            store,
            replaced_photo,
        })
    }

    /// All stores.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn list_stores(&self) -> Result<Vec<Store>, StoreError> {
        Ok(self.repos.stores.find_all().await?)
    }

    /// A store by slug, with its author if they still exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn store_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<(Store, Option<User>)>, StoreError> {
        let Some(store) = self.repos.stores.find_by_slug(slug).await? else {
            return Ok(None);
        };
        let author = self.repos.users.get_by_id(store.author).await?;
        Ok(Some((store, author)))
    }

    /// The tag list and the stores carrying `tag` (all stores if `None`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if either query fails.
    pub async fn stores_by_tag(
        &self,
        tag: Option<&str>,
    ) -> Result<(Vec<TagCount>, Vec<Store>), StoreError> {
        let (tags, stores) = tokio::try_join!(
            self.repos.stores.tag_counts(),
            self.repos.stores.find_by_tag(tag)
        )?;
        Ok((tags, stores))
    }

    /// The best-rated stores.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn top_stores(&self) -> Result<Vec<TopStore>, StoreError> {
        Ok(self.repos.stores.top_stores(TOP_STORES_LIMIT).await?)
    }

    /// Search stores by name and description.
    ///
    /// A blank query returns no hits without touching the repository.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredStore>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repos.stores.search(query, SEARCH_RESULTS_LIMIT).await?)
    }

    /// Toggle `store` in `user`'s hearts and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user or store doesn't exist.
    #[instrument(skip(self))]
    pub async fn heart_store(&self, user: UserId, store: StoreId) -> Result<User, StoreError> {
        let current = self.user(user).await?;

        let updated = if current.has_hearted(store) {
            self.repos.users.remove_heart(user, store).await?
        } else {
            if self.repos.stores.find_by_id(store).await?.is_none() {
                return Err(StoreError::NotFound);
            }
            self.repos.users.add_heart(user, store).await?
        };
        Ok(updated)
    }

    /// The stores `user` has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    pub async fn hearted_stores(&self, user: UserId) -> Result<Vec<Store>, StoreError> {
        let user = self.user(user).await?;
        Ok(self.repos.stores.find_by_ids(&user.hearts).await?)
    }

    /// Validate and save a review of `store` by `author`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the form has problems.
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    #[instrument(skip(self, text))]
    pub async fn add_review(
        &self,
        author: UserId,
        store: StoreId,
        text: &str,
        rating: &str,
    ) -> Result<Review, StoreError> {
        let (text, rating) = validate_review(text, rating)?;

        let review = self
            .repos
            .reviews
            .create(&NewReview {
                store_id: store,
                author,
                text,
                rating,
            })
            .await?;
        info!(review_id = %review.id, "Review added");
        Ok(review)
    }

    /// The full user record, or `None` when not logged in.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn viewer(&self, user: Option<UserId>) -> Result<Option<User>, StoreError> {
        match user {
            Some(id) => Ok(self.repos.users.get_by_id(id).await?),
            None => Ok(None),
        }
    }

    async fn user(&self, id: UserId) -> Result<User, StoreError> {
        self.repos
            .users
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

/// Fail unless `user` wrote `store`.
fn confirm_owner(store: &Store, user: UserId) -> Result<(), StoreError> {
    if store.is_author(user) {
        Ok(())
    } else {
        Err(StoreError::NotOwner)
    }
}
