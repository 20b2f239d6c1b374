//! Authentication service.
//!
//! Password registration and login. Sessions are handled by the routes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, instrument};

use delicious_core::Email;

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};
use crate::validation::{ValidationErrors, validate_registration};

/// Raw registration form values.
#[derive(Debug, Clone, Copy)]
pub struct RegisterInput<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository) -> Self {
        Self { users }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the form has problems.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput<'_>) -> Result<User, AuthError> {
        let registration = validate_registration(
            input.name,
            input.email,
            input.password,
            input.password_confirm,
        )?;

        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                name: registration.name,
                email: registration.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse_normalized(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

impl AuthError {
    /// Messages to show on the registration form, if this error belongs there.
    #[must_use]
    pub fn form_errors(&self) -> Option<ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::UserAlreadyExists => {
                Some(ValidationErrors::single("email", self.to_string()))
            }
            _ => None,
        }
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Repos;

    fn input<'a>(email: &'a str, password: &'a str, confirm: &'a str) -> RegisterInput<'a> {
        RegisterInput {
            name: "Wes",
            email,
            password,
            password_confirm: confirm,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter3", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login_with_unnormalized_email() {
        let repos = Repos::in_memory();
        let auth = AuthService::new(repos.users.as_ref());

        let user = auth
            .register(input("Wes@GoogleMail.com", "pw", "pw"))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "wes@gmail.com");

        let logged_in = auth.login(" WES@gmail.com ", "pw").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let repos = Repos::in_memory();
        let auth = AuthService::new(repos.users.as_ref());
        auth.register(input("wes@example.com", "pw", "pw"))
            .await
            .unwrap();

        for (email, password) in [("wes@example.com", "nope"), ("who@example.com", "pw"), ("bad", "pw")] {
            assert!(matches!(
                auth.login(email, password).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let repos = Repos::in_memory();
        let auth = AuthService::new(repos.users.as_ref());
        auth.register(input("wes@example.com", "pw", "pw"))
            .await
            .unwrap();

        let err = auth
            .register(input("WES@example.com", "pw", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert_eq!(
            err.form_errors().unwrap().messages(),
            ["That email is already registered"]
        );
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let repos = Repos::in_memory();
        let auth = AuthService::new(repos.users.as_ref());

        let err = auth
            .register(input("wes@example.com", "abc123", "abc124"))
            .await
            .unwrap_err();

        assert_eq!(
            err.form_errors().unwrap().messages(),
            ["Oops! Your passwords don't match"]
        );
    }
}
