//! Core types for Delicious.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod location;
pub mod rating;
pub mod slug;

pub use email::{Email, EmailError};
pub use id::*;
pub use location::{Coordinates, Location, LocationError, POINT};
pub use rating::{Rating, RatingError};
pub use slug::Slug;
