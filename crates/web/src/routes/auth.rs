//! Authentication route handlers.
//!
//! Password login, registration and logout. The logged-in user lives in the
//! session as a [`CurrentUser`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, push_flash, set_current_user};
use crate::models::{CurrentUser, FlashKind};
use crate::services::{AuthError, RegisterInput};
use crate::state::AppState;
use crate::views::{Page, PageContext};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub name: String,
    pub email: String,
    pub errors: Vec<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(ctx: PageContext) -> LoginTemplate {
    LoginTemplate {
        page: ctx.page("Login"),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    match state.auth().login(&form.email, &form.password).await {
        Ok(user) => {
            log_in(&session, &CurrentUser::from(&user)).await?;
            push_flash(&session, FlashKind::Success, "You are now logged in!").await?;
            Ok(Redirect::to("/"))
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            push_flash(&session, FlashKind::Error, "Failed Login!").await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: PageContext) -> RegisterTemplate {
    RegisterTemplate {
        page: ctx.page("Register"),
        name: String::new(),
        email: String::new(),
        errors: Vec::new(),
    }
}

/// Handle registration form submission.
///
/// A new account is logged in straight away.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let input = RegisterInput {
        name: &form.name,
        email: &form.email,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };

    match state.auth().register(input).await {
        Ok(user) => {
            log_in(&session, &CurrentUser::from(&user)).await?;
            push_flash(&session, FlashKind::Success, "You are now logged in!").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            let Some(errors) = e.form_errors() else {
                return Err(e.into());
            };

            let template = RegisterTemplate {
                page: PageContext::load(&session).await.page("Register"),
                name: form.name,
                email: form.email,
                errors: errors.messages(),
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    push_flash(&session, FlashKind::Success, "You are now logged out!").await?;
    Ok(Redirect::to("/"))
}

async fn log_in(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}
