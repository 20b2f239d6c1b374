//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Rating, ReviewId, StoreId, UserId};

/// Who wrote a review, as shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewAuthor {
    pub id: UserId,
    pub name: String,
}

/// A review of a store.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub store_id: StoreId,
    pub author: ReviewAuthor,
    pub text: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

/// A validated review about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub store_id: StoreId,
    pub author: UserId,
    pub text: String,
    pub rating: Rating,
}
