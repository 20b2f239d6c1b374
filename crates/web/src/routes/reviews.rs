//! Review submission.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;

use delicious_core::StoreId;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, push_flash};
use crate::models::FlashKind;
use crate::services::StoreError;
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rating: String,
}

/// Add a review, then go back to the store page.
///
/// Form problems are flashed rather than re-rendered; the review form sits on
/// the store page itself.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    session: Session,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let store = state
        .repos()
        .stores
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;

    match state
        .stores()
        .add_review(user.id, id, &form.text, &form.rating)
        .await
    {
        Ok(_) => push_flash(&session, FlashKind::Success, "Review Saved!").await?,
        Err(StoreError::Validation(errors)) => {
            for message in errors.messages() {
                push_flash(&session, FlashKind::Error, message).await?;
            }
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&format!("/store/{}", store.slug)))
}
