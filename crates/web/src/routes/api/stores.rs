//! Store JSON endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use delicious_core::StoreId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{ScoredStore, User};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Stores matching `q`, best first. A blank query matches nothing.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ScoredStore>>> {
    Ok(Json(state.stores().search(&query.q).await?))
}

/// Toggle the store in the current user's hearts and return the user.
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Json<User>> {
    Ok(Json(state.stores().heart_store(user.id, id).await?))
}
