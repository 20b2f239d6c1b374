//! HTTP route handlers for the store directory.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - All stores
//! GET  /stores                 - All stores
//! GET  /store/:slug            - Store detail
//! GET  /tags                   - Tag list with every store
//! GET  /tags/:tag              - Tag list with stores carrying the tag
//! GET  /top                    - Top-rated stores
//!
//! # Store forms (requires auth, multipart)
//! GET  /add                    - Add-store form
//! POST /add                    - Create store
//! POST /add/:id                - Update store (author only)
//! GET  /stores/:id/edit        - Edit-store form (author only)
//!
//! # Per-user (requires auth)
//! GET  /hearts                 - Hearted stores
//! POST /reviews/:id            - Review a store
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! GET  /logout                 - Logout action
//!
//! # JSON API
//! GET  /api/search?q=          - Text search
//! POST /api/stores/:id/heart   - Toggle heart (requires auth)
//!
//! # Health
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database reachable)
//! ```

pub mod api;
pub mod auth;
pub mod reviews;
pub mod stores;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Largest accepted request body; store forms carry a photo.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(stores::tags))
        .route("/tags/{tag}", get(stores::tag))
        .route("/top", get(stores::top))
        .route("/hearts", get(stores::hearts))
        .route("/reviews/{id}", post(reviews::create))
}

/// Create all routes for the directory.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(store_routes())
        .merge(auth_routes())
        .nest("/api", api::routes())
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().stores.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("page".to_owned())
}
