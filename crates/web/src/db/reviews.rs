//! Review repository for database operations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use delicious_core::{Rating, ReviewId, StoreId, UserId};

use super::{RepositoryError, ReviewRepository, map_constraint_error};
use crate::models::{NewReview, Review, ReviewAuthor};

/// Columns selected for a review joined with its author's name.
const REVIEW_COLUMNS: &str = "r.id, r.store_id, r.author_id, u.name AS author_name, \
                              r.text, r.rating, r.created_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ReviewRow {
    id: i32,
    store_id: i32,
    author_id: i32,
    author_name: String,
    text: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            store_id: StoreId::new(row.store_id),
            author: ReviewAuthor {
                id: UserId::new(row.author_id),
                name: row.author_name,
            },
            text: row.text,
            rating,
            created_at: row.created_at,
        })
    }
}

/// Load the reviews of several stores at once, newest first per store.
pub(super) async fn reviews_for_stores(
    pool: &PgPool,
    store_ids: &[i32],
) -> Result<HashMap<StoreId, Vec<Review>>, RepositoryError> {
    if store_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
        r"
        SELECT {REVIEW_COLUMNS}
        FROM directory.review r
        JOIN directory.user u ON u.id = r.author_id
        WHERE r.store_id = ANY($1)
        ORDER BY r.created_at DESC, r.id DESC
        "
    ))
    .bind(store_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<StoreId, Vec<Review>> = HashMap::new();
    for row in rows {
        let review = Review::try_from(row)?;
        grouped.entry(review.store_id).or_default().push(review);
    }
    Ok(grouped)
}

/// `PostgreSQL` implementation of [`ReviewRepository`].
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    #[instrument(skip(self, review), fields(store_id = %review.store_id, author = %review.author))]
    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row: ReviewRow = sqlx::query_as(&format!(
            r"
            WITH r AS (
                INSERT INTO directory.review (store_id, author_id, text, rating)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {REVIEW_COLUMNS}
            FROM r
            JOIN directory.user u ON u.id = r.author_id
            "
        ))
        .bind(review.store_id)
        .bind(review.author)
        .bind(&review.text)
        .bind(i16::from(review.rating.get()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "review"))?;

        debug!(id = row.id, "Inserted review");
        Review::try_from(row)
    }

    async fn list_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let mut grouped = reviews_for_stores(&self.pool, &[store.as_i32()]).await?;
        Ok(grouped.remove(&store).unwrap_or_default())
    }
}
