//! Delicious store directory library.
//!
//! Everything the `delicious-web` binary serves, exposed as a library so
//! the integration tests can drive the full router against in-memory
//! repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod uploads;
pub mod validation;
pub mod views;

use axum::{Router, extract::Request};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the application router.
///
/// The Sentry layers are left to the binary; everything else (static files,
/// sessions, request IDs and tracing) is wired here.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config();
    let static_files = ServeDir::new(&config.static_dir);
    let uploads = ServeDir::new(&config.uploads_dir);

    routes::routes()
        .nest_service("/static", static_files)
        .nest_service("/uploads", uploads)
        .fallback(routes::not_found)
        .layer(sessions)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
