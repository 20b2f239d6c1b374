//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Location, Slug, StoreId, UserId};

use super::Review;

/// Tags offered as checkboxes on the store form.
pub const TAG_CHOICES: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Placeholder shown for stores without an uploaded photo.
const DEFAULT_PHOTO_URL: &str = "/static/images/store.svg";

/// A store listing with its reviews attached.
///
/// Every repository read returns stores with `reviews` populated, newest
/// review first.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub location: Location,
    pub photo: Option<String>,
    pub author: UserId,
    pub reviews: Vec<Review>,
}

impl Store {
    /// Public URL of the store photo, or the placeholder image.
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }

    /// Whether `user` wrote this listing.
    #[must_use]
    pub fn is_author(&self, user: UserId) -> bool {
        self.author == user
    }
}

/// Validated, user-editable store fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFields {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
    /// Newly uploaded photo filename. `None` keeps the current photo on update.
    pub photo: Option<String>,
}

/// A store about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStore {
    pub fields: StoreFields,
    pub author: UserId,
}

/// One row of the tag list: how many stores carry `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Projection used by the top-stores page.
#[derive(Debug, Clone, Serialize)]
pub struct TopStore {
    pub photo: Option<String>,
    pub name: String,
    pub slug: Slug,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
}

impl TopStore {
    /// Public URL of the store photo, or the placeholder image.
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }

    /// Average rating rounded to one decimal for display.
    #[must_use]
    pub fn average_display(&self) -> String {
        format!("{:.1}", self.average_rating)
    }
}

/// A text search hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredStore {
    #[serde(flatten)]
    pub store: Store,
    pub score: f64,
}

fn photo_url(photo: Option<&str>) -> String {
    photo.map_or_else(
        || DEFAULT_PHOTO_URL.to_owned(),
        |name| format!("/uploads/{name}"),
    )
}
