//! Store repository for database operations.
//!
//! Queries use the runtime `query_as` API with `FromRow` rows rather than
//! the compile-time macros, so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use delicious_core::{Coordinates, Location, Slug, StoreId, UserId};

use super::reviews::reviews_for_stores;
use super::{RepositoryError, StoreRepository, map_constraint_error};
use crate::models::{NewStore, ScoredStore, Store, StoreFields, TagCount, TopStore};

const STORE_COLUMNS: &str = "id, name, slug, description, tags, created_at, \
                             location_type, longitude, latitude, address, photo, author_id";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    location_type: String,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
    author_id: i32,
}

impl StoreRow {
    fn into_store(self) -> Result<Store, RepositoryError> {
        let coordinates = Coordinates::new(self.longitude, self.latitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
        })?;

        Ok(Store {
            id: StoreId::new(self.id),
            name: self.name,
            slug: Slug::from_stored(self.slug),
            description: self.description,
            tags: self.tags,
            created_at: self.created_at,
            location: Location {
                kind: self.location_type,
                coordinates,
                address: self.address,
            },
            photo: self.photo,
            author: UserId::new(self.author_id),
            reviews: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    #[sqlx(flatten)]
    store: StoreRow,
    score: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopStoreRow {
    id: i32,
    name: String,
    slug: String,
    photo: Option<String>,
    average_rating: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct TagCountRow {
    tag: String,
    count: i64,
}

/// `PostgreSQL` implementation of [`StoreRepository`].
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Derive a slug from `name` that doesn't collide with existing ones.
    ///
    /// Counting and inserting are separate statements, so two concurrent
    /// writers can still end up with the same slug.
    async fn unique_slug(
        &self,
        name: &str,
        exclude: Option<StoreId>,
    ) -> Result<Slug, RepositoryError> {
        let slug = Slug::from_name(name);

        let (collisions,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM directory.store
            WHERE slug ~* $1 AND ($2::int IS NULL OR id <> $2)
            ",
        )
        .bind(slug.variant_pattern())
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(slug.deduplicate(usize::try_from(collisions).unwrap_or_default()))
    }

    /// Convert rows and attach each store's reviews.
    async fn with_reviews(&self, rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut reviews = reviews_for_stores(&self.pool, &ids).await?;

        rows.into_iter()
            .map(|row| {
                let mut store = row.into_store()?;
                store.reviews = reviews.remove(&store.id).unwrap_or_default();
                Ok(store)
            })
            .collect()
    }

    async fn one_with_reviews(
        &self,
        row: Option<StoreRow>,
    ) -> Result<Option<Store>, RepositoryError> {
        match row {
            Some(row) => Ok(self.with_reviews(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    #[instrument(skip(self, store), fields(name = %store.fields.name))]
    async fn insert(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let slug = self.unique_slug(&store.fields.name, None).await?;
        let fields = &store.fields;

        let row: StoreRow = sqlx::query_as(&format!(
            r"
            INSERT INTO directory.store
                (name, slug, description, tags, location_type, longitude, latitude,
                 address, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(slug.as_str())
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.location.kind)
        .bind(fields.location.coordinates.longitude())
        .bind(fields.location.coordinates.latitude())
        .bind(&fields.location.address)
        .bind(&fields.photo)
        .bind(store.author)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "store"))?;

        debug!(id = row.id, slug = %row.slug, "Inserted store");
        row.into_store()
    }

    #[instrument(skip(self, fields), fields(store_id = %id))]
    async fn update(&self, id: StoreId, fields: &StoreFields) -> Result<Store, RepositoryError> {
        let existing: Option<(String, String)> =
            sqlx::query_as("SELECT name, slug FROM directory.store WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let (current_name, current_slug) = existing.ok_or(RepositoryError::NotFound)?;

        let slug = if current_name == fields.name {
            Slug::from_stored(current_slug)
        } else {
            self.unique_slug(&fields.name, Some(id)).await?
        };

        let row: Option<StoreRow> = sqlx::query_as(&format!(
            r"
            UPDATE directory.store
            SET name = $2, slug = $3, description = $4, tags = $5, location_type = $6,
                longitude = $7, latitude = $8, address = $9, photo = COALESCE($10, photo)
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(slug.as_str())
        .bind(&fields.description)
        .bind(&fields.tags)
        .bind(&fields.location.kind)
        .bind(fields.location.coordinates.longitude())
        .bind(fields.location.coordinates.latitude())
        .bind(&fields.location.address)
        .bind(&fields.photo)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_reviews(row)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.with_reviews(rows).await
    }

    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_reviews(row).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE slug = $1 ORDER BY id LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_reviews(row).await
    }

    async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let Some(tag) = tag else {
            return self.find_all().await;
        };

        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE $1 = ANY(tags) ORDER BY id"
        ))
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        self.with_reviews(rows).await
    }

    async fn find_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(StoreId::as_i32).collect();
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        self.with_reviews(rows).await
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows: Vec<TagCountRow> = sqlx::query_as(
            r"
            SELECT tag, COUNT(*) AS count
            FROM directory.store, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TagCount {
                tag: r.tag,
                count: r.count,
            })
            .collect())
    }

    async fn top_stores(&self, limit: usize) -> Result<Vec<TopStore>, RepositoryError> {
        let rows: Vec<TopStoreRow> = sqlx::query_as(
            r"
            SELECT s.id, s.name, s.slug, s.photo, AVG(r.rating)::float8 AS average_rating
            FROM directory.store s
            JOIN directory.review r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= 2
            ORDER BY average_rating DESC
            LIMIT $1
            ",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut reviews = reviews_for_stores(&self.pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| TopStore {
                reviews: reviews.remove(&StoreId::new(r.id)).unwrap_or_default(),
                photo: r.photo,
                name: r.name,
                slug: Slug::from_stored(r.slug),
                average_rating: r.average_rating,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        // plainto_tsquery ANDs its terms; any matching term should be a hit.
        let rows: Vec<SearchRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS}, ts_rank(search_vector, tsq)::float8 AS score
            FROM directory.store,
                 LATERAL (
                     SELECT replace(plainto_tsquery('english', $1)::text, ' & ', ' | ')::tsquery
                         AS tsq
                 ) q
            WHERE search_vector @@ tsq
            ORDER BY score DESC
            LIMIT $2
            "
        ))
        .bind(query)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
        let stores = self
            .with_reviews(rows.into_iter().map(|r| r.store).collect())
            .await?;

        Ok(stores
            .into_iter()
            .zip(scores)
            .map(|(store, score)| ScoredStore { store, score })
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
