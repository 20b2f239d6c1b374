//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash::push_flash;
use crate::models::{CurrentUser, FlashKind, session_keys};

/// Message shown when an anonymous user hits a protected page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Oops! You must be logged in to do that!";

/// Extractor that requires a logged-in user.
///
/// Anonymous page requests are redirected to `/login` with a flash message;
/// anonymous API requests get a bare 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        if let Some(user) = current_user(session).await {
            return Ok(Self(user));
        }

        // Nested routers see a stripped path; check the one the client sent.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path());
        if path.starts_with("/api/") {
            return Err(AuthRejection::Unauthorized);
        }

        if let Err(e) = push_flash(session, FlashKind::Error, LOGIN_REQUIRED_MESSAGE).await {
            tracing::warn!(error = %e, "Failed to queue login flash");
        }
        Err(AuthRejection::RedirectToLogin)
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current user in the session (login).
///
/// The session ID is cycled first so a pre-login ID can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body, extract::Request, routing::get};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    async fn whoami(RequireAuth(user): RequireAuth) -> String {
        user.name
    }

    fn app() -> Router {
        Router::new()
            .route("/hearts", get(whoami))
            .nest("/api", Router::new().route("/me", get(whoami)))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn get_status(uri: &str) -> (StatusCode, Option<String>) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let location = response
            .headers()
            .get("location")
            .map(|v| v.to_str().unwrap().to_owned());
        (response.status(), location)
    }

    #[tokio::test]
    async fn test_anonymous_page_redirects_to_login() {
        let (status, location) = get_status("/hearts").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn test_anonymous_api_gets_401() {
        let (status, location) = get_status("/api/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(location, None);
    }

    #[tokio::test]
    async fn test_login_required_flash_is_queued() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut parts = Request::builder()
            .uri("/hearts")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts.extensions.insert(session.clone());

        assert!(RequireAuth::from_request_parts(&mut parts, &()).await.is_err());

        let flashes = crate::middleware::take_flashes(&session).await;
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].message, LOGIN_REQUIRED_MESSAGE);
    }
}
