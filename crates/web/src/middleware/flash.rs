//! Session-backed flash messages.
//!
//! Handlers push messages before redirecting; the next rendered page takes
//! them out of the session and shows them once.

use tower_sessions::Session;

use crate::models::{Flash, FlashKind, session_keys};

/// Queue a message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await?
        .unwrap_or_default();
    flashes.push(Flash {
        kind,
        message: message.into(),
    });
    session.insert(session_keys::FLASHES, flashes).await
}

/// Remove and return every pending message.
///
/// Unreadable flash data is dropped rather than failing the page.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(session_keys::FLASHES).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable flash messages");
            Vec::new()
        }
    }
}
