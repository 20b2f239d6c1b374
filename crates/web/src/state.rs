//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::WebConfig;
use crate::db::Repos;
use crate::services::{AuthService, StoreService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like repositories and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    repos: Repos,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Web configuration
    /// * `repos` - Repository implementations (`PostgreSQL` or in-memory)
    #[must_use]
    pub fn new(config: WebConfig, repos: Repos) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, repos }),
        }
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn repos(&self) -> &Repos {
        &self.inner.repos
    }

    /// Store service borrowing this state's repositories.
    #[must_use]
    pub fn stores(&self) -> StoreService<'_> {
        StoreService::new(&self.inner.repos)
    }

    /// Auth service borrowing this state's user repository.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.repos.users.as_ref())
    }
}
