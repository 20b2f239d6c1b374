//! In-memory repositories for tests.
//!
//! One [`MemoryDatabase`] implements every repository trait so that stores,
//! users and reviews can see each other. Each operation takes the lock it
//! needs and releases it before returning; slug assignment reads and writes
//! under separate locks, matching the `PostgreSQL` adapter's race window.

use async_trait::async_trait;
use chrono::Utc;
use regex::RegexBuilder;
use tokio::sync::RwLock;

use delicious_core::{Email, ReviewId, Slug, StoreId, UserId};

use super::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};
use crate::aggregate;
use crate::models::{
    NewReview, NewStore, NewUser, Review, ReviewAuthor, ScoredStore, Store, StoreFields, TagCount,
    TopStore, User,
};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    /// Stores without reviews; those are attached on read.
    stores: Vec<Store>,
    reviews: Vec<Review>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn populate(&self, store: &Store) -> Store {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.store_id == store.id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Store {
            reviews,
            ..store.clone()
        }
    }

    fn populated<'a>(&self, stores: impl Iterator<Item = &'a Store>) -> Vec<Store> {
        stores.map(|s| self.populate(s)).collect()
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut User, RepositoryError> {
        self.users
            .iter_mut()
            .map(|r| &mut r.user)
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Shared in-process storage behind all three repository traits.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    /// Same collision rule as the `PostgreSQL` adapter's `slug ~* $1`.
    async fn unique_slug(
        &self,
        name: &str,
        exclude: Option<StoreId>,
    ) -> Result<Slug, RepositoryError> {
        let slug = Slug::from_name(name);
        let variants = RegexBuilder::new(&slug.variant_pattern())
            .case_insensitive(true)
            .build()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid slug pattern: {e}")))?;

        let collisions = {
            let tables = self.tables.read().await;
            tables
                .stores
                .iter()
                .filter(|s| Some(s.id) != exclude && variants.is_match(s.slug.as_str()))
                .count()
        };
        Ok(slug.deduplicate(collisions))
    }
}

#[async_trait]
impl StoreRepository for MemoryDatabase {
    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let slug = self.unique_slug(&store.fields.name, None).await?;

        let mut tables = self.tables.write().await;
        let fields = store.fields.clone();
        let created = Store {
            id: StoreId::new(tables.next_id()),
            name: fields.name,
            slug,
            description: fields.description,
            tags: fields.tags,
            created_at: Utc::now(),
            location: fields.location,
            photo: fields.photo,
            author: store.author,
            reviews: Vec::new(),
        };
        tables.stores.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: StoreId, fields: &StoreFields) -> Result<Store, RepositoryError> {
        let current_name = {
            let tables = self.tables.read().await;
            tables
                .stores
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .ok_or(RepositoryError::NotFound)?
        };
        let new_slug = if current_name == fields.name {
            None
        } else {
            Some(self.unique_slug(&fields.name, Some(id)).await?)
        };

        let mut tables = self.tables.write().await;
        let store = tables
            .stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;

        let fields = fields.clone();
        store.name = fields.name;
        store.description = fields.description;
        store.tags = fields.tags;
        store.location = fields.location;
        if let Some(photo) = fields.photo {
            store.photo = Some(photo);
        }
        if let Some(slug) = new_slug {
            store.slug = slug;
        }

        let updated = store.clone();
        Ok(tables.populate(&updated))
    }

    async fn find_all(&self) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.populated(tables.stores.iter()))
    }

    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .iter()
            .find(|s| s.id == id)
            .map(|s| tables.populate(s)))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .iter()
            .find(|s| s.slug.as_str() == slug)
            .map(|s| tables.populate(s)))
    }

    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.populated(
            tables
                .stores
                .iter()
                .filter(|s| tag.is_none_or(|t| s.tags.iter().any(|st| st == t))),
        ))
    }

    async fn find_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.populated(tables.stores.iter().filter(|s| ids.contains(&s.id))))
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(aggregate::tag_counts(&tables.stores))
    }

    async fn top_stores(&self, limit: usize) -> Result<Vec<TopStore>, RepositoryError> {
        let tables = self.tables.read().await;
        let stores = tables.populated(tables.stores.iter());
        Ok(aggregate::top_stores(&stores, limit))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        let tables = self.tables.read().await;
        let stores = tables.populated(tables.stores.iter());
        Ok(aggregate::search(&stores, query, limit))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|r| r.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let created = User {
            id: UserId::new(tables.next_id()),
            name: user.name.clone(),
            email: user.email.clone(),
            hearts: Vec::new(),
            created_at: Utc::now(),
        };
        tables.users.push(UserRecord {
            user: created.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn add_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.stores.iter().any(|s| s.id == store) {
            return Err(RepositoryError::NotFound);
        }

        let user = tables.user_mut(user)?;
        if !user.hearts.contains(&store) {
            user.hearts.push(store);
        }
        Ok(user.clone())
    }

    async fn remove_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(user)?;
        user.hearts.retain(|s| *s != store);
        Ok(user.clone())
    }
}

#[async_trait]
impl ReviewRepository for MemoryDatabase {
    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.stores.iter().any(|s| s.id == review.store_id) {
            return Err(RepositoryError::NotFound);
        }
        let author = tables
            .users
            .iter()
            .find(|r| r.user.id == review.author)
            .map(|r| ReviewAuthor {
                id: r.user.id,
                name: r.user.name.clone(),
            })
            .ok_or(RepositoryError::NotFound)?;

        let created = Review {
            id: ReviewId::new(tables.next_id()),
            store_id: review.store_id,
            author,
            text: review.text.clone(),
            rating: review.rating,
            created_at: Utc::now(),
        };
        tables.reviews.push(created.clone());
        Ok(created)
    }

    async fn list_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        let stub = tables.stores.iter().find(|s| s.id == store);
        Ok(stub.map(|s| tables.populate(s).reviews).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delicious_core::{Coordinates, Location, Rating};

    use super::*;

    fn fields(name: &str) -> StoreFields {
        StoreFields {
            name: name.to_owned(),
            description: "Tasty".to_owned(),
            tags: vec!["Wifi".to_owned()],
            location: Location::point(Coordinates::new(-79.4, 43.6).unwrap(), "1 Main St")
                .unwrap(),
            photo: None,
        }
    }

    async fn user(db: &MemoryDatabase, email: &str) -> User {
        UserRepository::create(
            db,
            &NewUser {
                name: "Wes".to_owned(),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
            },
        )
        .await
        .unwrap()
    }

    async fn store(db: &MemoryDatabase, name: &str, author: UserId) -> Store {
        db.insert(&NewStore {
            fields: fields(name),
            author,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_name_gets_suffixed_slug() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;

        let first = store(&db, "Coffee House", wes.id).await;
        let second = store(&db, "Coffee House", wes.id).await;
        let third = store(&db, "coffee house", wes.id).await;

        assert_eq!(first.slug.as_str(), "coffee-house");
        assert_eq!(second.slug.as_str(), "coffee-house-2");
        assert_eq!(third.slug.as_str(), "coffee-house-3");
    }

    #[tokio::test]
    async fn test_slug_collisions_follow_variant_pattern() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;

        // Neither is `pizza` followed by an optional numeric suffix.
        store(&db, "Pizza Place", wes.id).await;
        store(&db, "Pizzas", wes.id).await;
        assert_eq!(store(&db, "Pizza", wes.id).await.slug.as_str(), "pizza");

        let second = store(&db, "PIZZA", wes.id).await;
        assert_eq!(second.slug.as_str(), "pizza-2");
        let third = store(&db, "pizza!", wes.id).await;
        assert_eq!(third.slug.as_str(), "pizza-3");
    }

    #[tokio::test]
    async fn test_rename_reslugs_without_counting_itself() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;
        let created = store(&db, "Old Name", wes.id).await;

        let renamed = db.update(created.id, &fields("New Name")).await.unwrap();
        assert_eq!(renamed.slug.as_str(), "new-name");

        let unchanged = db.update(created.id, &fields("New Name")).await.unwrap();
        assert_eq!(unchanged.slug.as_str(), "new-name");
    }

    #[tokio::test]
    async fn test_update_keeps_photo_when_none_given() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;
        let mut with_photo = fields("Snap");
        with_photo.photo = Some("a.jpeg".to_owned());
        let created = db
            .insert(&NewStore {
                fields: with_photo,
                author: wes.id,
            })
            .await
            .unwrap();

        let updated = db.update(created.id, &fields("Snap")).await.unwrap();
        assert_eq!(updated.photo.as_deref(), Some("a.jpeg"));
    }

    #[tokio::test]
    async fn test_update_unknown_store() {
        let db = MemoryDatabase::default();
        let err = db.update(StoreId::new(99), &fields("X")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = MemoryDatabase::default();
        user(&db, "wes@example.com").await;

        let err = UserRepository::create(
            &db,
            &NewUser {
                name: "Other".to_owned(),
                email: Email::parse("wes@example.com").unwrap(),
                password_hash: "hash".to_owned(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reads_attach_reviews_newest_first() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;
        let created = store(&db, "Reviewed", wes.id).await;

        for text in ["first", "second"] {
            ReviewRepository::create(
                &db,
                &NewReview {
                    store_id: created.id,
                    author: wes.id,
                    text: text.to_owned(),
                    rating: Rating::new(4).unwrap(),
                },
            )
            .await
            .unwrap();
        }

        let found = db.find_by_slug("reviewed").await.unwrap().unwrap();
        let texts: Vec<&str> = found.reviews.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);
        assert_eq!(found.reviews[0].author.name, "Wes");
    }

    #[tokio::test]
    async fn test_find_by_tag_none_lists_everything() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;
        store(&db, "One", wes.id).await;
        let mut untagged = fields("Two");
        untagged.tags.clear();
        db.insert(&NewStore {
            fields: untagged,
            author: wes.id,
        })
        .await
        .unwrap();

        assert_eq!(db.find_by_tag(None).await.unwrap().len(), 2);
        assert_eq!(db.find_by_tag(Some("Wifi")).await.unwrap().len(), 1);
        assert!(db.find_by_tag(Some("Licensed")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hearts_toggle_and_unknown_store() {
        let db = MemoryDatabase::default();
        let wes = user(&db, "wes@example.com").await;
        let created = store(&db, "Loved", wes.id).await;

        let hearted = db.add_heart(wes.id, created.id).await.unwrap();
        let again = db.add_heart(wes.id, created.id).await.unwrap();
        assert_eq!(hearted.hearts, [created.id]);
        assert_eq!(again.hearts, [created.id]);

        let cleared = db.remove_heart(wes.id, created.id).await.unwrap();
        assert!(cleared.hearts.is_empty());

        let err = db.add_heart(wes.id, StoreId::new(999)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
