//! Domain models for the store directory.
//!
//! These are the validated shapes handlers and templates work with. Database
//! row types live next to the queries in `db`.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::{NewReview, Review, ReviewAuthor};
pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
pub use store::{
    NewStore, ScoredStore, Store, StoreFields, TAG_CHOICES, TagCount, TopStore,
};
pub use user::{NewUser, User};
