//! Store page handlers.
//!
//! Listing, detail, tag, top and hearts pages, plus the add/edit forms.
//! Forms are `multipart/form-data` so a photo can ride along.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use delicious_core::{Rating, StoreId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::{FlashKind, Store, TopStore, User};
use crate::services::{StoreError, UpdatedStore};
use crate::state::AppState;
use crate::uploads::{UploadError, remove_photo, save_photo};
use crate::validation::{StoreInput, ValidationErrors, validate_store};
use crate::views::{Page, PageContext, StoreCard, StoreFormView, TagLink};

// =============================================================================
// Templates
// =============================================================================

/// Store listing (index and hearts).
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub page: Page,
    pub stores: Vec<StoreCard>,
}

/// Store detail page.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub page: Page,
    pub store: Store,
    pub author: Option<User>,
    pub tags: Vec<TagLink>,
    pub rating_choices: Vec<u8>,
}

/// Add/edit store form.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct StoreFormTemplate {
    pub page: Page,
    pub form: StoreFormView,
}

/// Tag list with matching stores.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub page: Page,
    pub tags: Vec<TagLink>,
    pub stores: Vec<StoreCard>,
}

/// Top-rated stores.
#[derive(Template, WebTemplate)]
#[template(path = "top_stores.html")]
pub struct TopStoresTemplate {
    pub page: Page,
    pub stores: Vec<TopStore>,
}

// =============================================================================
// Listing Routes
// =============================================================================

/// All stores.
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<StoresTemplate> {
    let service = state.stores();
    let viewer = service.viewer(ctx.user.as_ref().map(|u| u.id)).await?;
    let stores = service.list_stores().await?;

    Ok(StoresTemplate {
        stores: StoreCard::list(stores, viewer.as_ref()),
        page: ctx.page("Stores"),
    })
}

/// A single store by slug.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ctx: PageContext,
) -> Result<StoreTemplate> {
    let (store, author) = state
        .stores()
        .store_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {slug}")))?;

    Ok(StoreTemplate {
        tags: TagLink::from_tags(&store.tags),
        rating_choices: (Rating::MIN..=Rating::MAX).rev().collect(),
        page: ctx.page(store.name.clone()),
        store,
        author,
    })
}

/// Tag list with every store.
pub async fn tags(state: State<AppState>, ctx: PageContext) -> Result<TagsTemplate> {
    render_tags(state, ctx, None).await
}

/// Tag list with stores carrying one tag.
pub async fn tag(
    state: State<AppState>,
    Path(tag): Path<String>,
    ctx: PageContext,
) -> Result<TagsTemplate> {
    render_tags(state, ctx, Some(tag)).await
}

async fn render_tags(
    State(state): State<AppState>,
    ctx: PageContext,
    tag: Option<String>,
) -> Result<TagsTemplate> {
    let service = state.stores();
    let viewer = service.viewer(ctx.user.as_ref().map(|u| u.id)).await?;
    let (counts, stores) = service.stores_by_tag(tag.as_deref()).await?;

    let title = tag.clone().unwrap_or_else(|| "Tags".to_owned());
    Ok(TagsTemplate {
        tags: TagLink::from_counts(counts, tag.as_deref()),
        stores: StoreCard::list(stores, viewer.as_ref()),
        page: ctx.page(title),
    })
}

/// Best-rated stores.
pub async fn top(State(state): State<AppState>, ctx: PageContext) -> Result<TopStoresTemplate> {
    let stores = state.stores().top_stores().await?;
    Ok(TopStoresTemplate {
        stores,
        page: ctx.page("★ Top Stores!"),
    })
}

/// Stores the current user has hearted.
pub async fn hearts(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ctx: PageContext,
) -> Result<StoresTemplate> {
    let service = state.stores();
    let viewer = service.viewer(Some(user.id)).await?;
    let stores = service.hearted_stores(user.id).await?;

    Ok(StoresTemplate {
        stores: StoreCard::list(stores, viewer.as_ref()),
        page: ctx.page("Hearted Stores"),
    })
}

// =============================================================================
// Form Routes
// =============================================================================

/// Display the add-store form.
pub async fn add_page(_auth: RequireAuth, ctx: PageContext) -> StoreFormTemplate {
    StoreFormTemplate {
        page: ctx.page("Add Store"),
        form: StoreFormView::blank(),
    }
}

/// Display the edit form; only the author may see it.
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    ctx: PageContext,
) -> Result<StoreFormTemplate> {
    let store = state.stores().edit_store(id, user.id).await?;

    Ok(StoreFormTemplate {
        page: ctx.page(format!("Edit {}", store.name)),
        form: StoreFormView::for_store(&store),
    })
}

/// Handle the add-store form.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let submission = read_store_form(multipart).await?;
    let action = "/add".to_owned();

    let photo = match accept_photo(&state, submission.photo).await? {
        Ok(photo) => photo,
        Err(errors) => {
            return invalid_form(&session, "Add Store", action, &submission.input, errors).await;
        }
    };

    match state
        .stores()
        .create_store(user.id, &submission.input, photo.clone())
        .await
    {
        Ok(store) => {
            push_flash(
                &session,
                FlashKind::Success,
                format!("Successfully created {}. Care to leave a review?", store.name),
            )
            .await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
        }
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            match e {
                StoreError::Validation(errors) => {
                    invalid_form(&session, "Add Store", action, &submission.input, errors).await
                }
                other => Err(other.into()),
            }
        }
    }
}

/// Handle the edit form; only the author may submit it.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let submission = read_store_form(multipart).await?;
    let action = format!("/add/{id}");

    let photo = match accept_photo(&state, submission.photo).await? {
        Ok(photo) => photo,
        Err(errors) => {
            // Ownership still wins over form problems.
            state.stores().edit_store(id, user.id).await?;
            return invalid_form(&session, "Edit Store", action, &submission.input, errors).await;
        }
    };

    match state
        .stores()
        .update_store(id, user.id, &submission.input, photo.clone())
        .await
    {
        Ok(UpdatedStore {
            store,
            replaced_photo,
        }) => {
            discard_photo(&state, replaced_photo.as_deref()).await;
            push_flash(
                &session,
                FlashKind::Success,
                format!("Successfully updated {}.", store.name),
            )
            .await?;
            Ok(Redirect::to(&format!("/stores/{}/edit", store.id)).into_response())
        }
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            match e {
                StoreError::Validation(errors) => {
                    invalid_form(&session, "Edit Store", action, &submission.input, errors).await
                }
                other => Err(other.into()),
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// A submitted store form.
struct StoreSubmission {
    input: StoreInput,
    photo: Option<PhotoPart>,
}

/// A non-empty uploaded file.
struct PhotoPart {
    content_type: String,
    bytes: Bytes,
}

async fn read_store_form(mut multipart: Multipart) -> Result<StoreSubmission> {
    let bad_request =
        |e: axum::extract::multipart::MultipartError| AppError::BadRequest(e.to_string());

    let mut input = StoreInput::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field.bytes().await.map_err(bad_request)?;
            if !bytes.is_empty() {
                photo = Some(PhotoPart {
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_request)?;
        match name.as_str() {
            "name" => input.name = value,
            "description" => input.description = value,
            "tags" => input.tags.push(value),
            "address" => input.address = value,
            "lng" => input.longitude = value,
            "lat" => input.latitude = value,
            _ => {}
        }
    }

    Ok(StoreSubmission { input, photo })
}

/// Write the uploaded photo, if any.
///
/// A disallowed file type is a form error (inner `Err`); I/O failures are
/// server errors (outer `Err`).
async fn accept_photo(
    state: &AppState,
    photo: Option<PhotoPart>,
) -> Result<std::result::Result<Option<String>, ValidationErrors>> {
    let Some(photo) = photo else {
        return Ok(Ok(None));
    };

    match save_photo(&state.config().uploads_dir, &photo.content_type, &photo.bytes).await {
        Ok(filename) => Ok(Ok(Some(filename))),
        Err(e @ UploadError::UnsupportedType(_)) => {
            Ok(Err(ValidationErrors::single("photo", e.to_string())))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a photo no store refers to: one written for a rejected
/// submission, or one an edit replaced.
async fn discard_photo(state: &AppState, photo: Option<&str>) {
    if let Some(filename) = photo {
        if let Err(e) = remove_photo(&state.config().uploads_dir, filename).await {
            tracing::warn!(error = %e, %filename, "Failed to discard photo");
        }
    }
}

/// Re-render the store form with every problem found.
async fn invalid_form(
    session: &Session,
    title: &str,
    action: String,
    input: &StoreInput,
    mut errors: ValidationErrors,
) -> Result<Response> {
    // A bad photo short-circuits before the fields are checked; add theirs too.
    if errors.iter().all(|e| e.field == "photo") {
        if let Err(field_errors) = validate_store(input) {
            for e in field_errors.iter() {
                errors.push(e.field, e.message.clone());
            }
        }
    }

    let template = StoreFormTemplate {
        page: PageContext::load(session).await.page(title),
        form: StoreFormView::resubmitted(action, input, &errors),
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
}
