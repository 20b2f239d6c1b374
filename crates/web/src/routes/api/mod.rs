//! JSON API routes.
//!
//! ```text
//! GET  /api/search?q=          - Text search (top 5 by relevance)
//! POST /api/stores/{id}/heart  - Toggle a heart (auth)
//! ```

pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the API routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(stores::search))
        .route("/stores/{id}/heart", post(stores::heart))
}
