//! User repository for database operations.
//!
//! This module provides database access for users and their hearted stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use delicious_core::{Email, StoreId, UserId};

use super::{RepositoryError, UserRepository, map_constraint_error};
use crate::models::{NewUser, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// `PostgreSQL` implementation of [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach hearts to a user row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    async fn hydrate(&self, row: UserRow) -> Result<User, RepositoryError> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let hearts: Vec<(i32,)> = sqlx::query_as(
            r"
            SELECT store_id
            FROM directory.user_heart
            WHERE user_id = $1
            ORDER BY created_at, store_id
            ",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(User {
            id: UserId::new(row.id),
            name: row.name,
            email,
            hearts: hearts.into_iter().map(|(id,)| StoreId::new(id)).collect(),
            created_at: row.created_at,
        })
    }

    async fn require(&self, id: UserId) -> Result<User, RepositoryError> {
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO directory.user (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "email already exists"))?;

        debug!(id = row.id, "Created user");
        self.hydrate(row).await
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, created_at FROM directory.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(
            r"
            SELECT id, name, email, created_at, password_hash
            FROM directory.user
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = self.hydrate(row.user).await?;
                Ok(Some((user, row.password_hash)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn add_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO directory.user_heart (user_id, store_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user)
        .bind(store)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "heart"))?;

        self.require(user).await
    }

    #[instrument(skip(self))]
    async fn remove_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError> {
        sqlx::query("DELETE FROM directory.user_heart WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(&self.pool)
            .await?;

        self.require(user).await
    }
}
