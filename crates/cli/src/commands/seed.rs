//! Seed the directory with sample users, stores and reviews.
//!
//! The YAML file is parsed and cross-checked before any connection is made.
//! Rows go through the same services the web handlers use, so passwords are
//! hashed, slugs are derived and every field is validated.
//!
//! ```yaml
//! users:
//!   - { name: Wes, email: wes@example.com, password: wes }
//! stores:
//!   - name: Cafe Neon
//!     description: Coffee and pastries
//!     tags: [Wifi, Family Friendly]
//!     address: 1 Main St
//!     lng: -79.38
//!     lat: 43.65
//!     author: wes@example.com
//! reviews:
//!   - { store: Cafe Neon, author: wes@example.com, text: Great!, rating: 5 }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info};

use delicious_core::{Email, StoreId, UserId};
use delicious_web::db::{self, Repos};
use delicious_web::services::{AuthService, RegisterInput, StoreService};
use delicious_web::validation::StoreInput;

use super::{CommandError, database_url};

/// A whole seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub stores: Vec<SeedStore>,
    #[serde(default)]
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedStore {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    pub lng: f64,
    pub lat: f64,
    /// Email of one of the seeded users.
    pub author: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedReview {
    /// Name of one of the seeded stores.
    pub store: String,
    /// Email of one of the seeded users.
    pub author: String,
    pub text: String,
    pub rating: u8,
}

/// Load `path` into the database.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, references an
/// unknown user or store, or a row is rejected.
pub async fn run(path: &Path, clear: bool) -> Result<(), CommandError> {
    info!(path = %path.display(), "Loading seed data from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::Seed(format!(
            "{} validation errors found",
            errors.len()
        )));
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    if clear {
        clear_directory(&pool).await?;
        info!("Existing users, stores, reviews and hearts deleted");
    }

    let repos = Repos::postgres(&pool);
    let summary = load(&repos, &seed).await?;

    info!("Seeding complete!");
    info!("  Users: {}", summary.users);
    info!("  Stores: {}", summary.stores);
    info!("  Reviews: {}", summary.reviews);
    Ok(())
}

/// Rows written by [`load`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub stores: usize,
    pub reviews: usize,
}

/// Insert everything in `seed` through the services.
///
/// # Errors
///
/// Returns `CommandError::Seed` naming the first row that was rejected.
pub async fn load(repos: &Repos, seed: &SeedFile) -> Result<SeedSummary, CommandError> {
    let auth = AuthService::new(repos.users.as_ref());
    let stores = StoreService::new(repos);

    let mut user_ids: HashMap<String, UserId> = HashMap::new();
    for user in &seed.users {
        let created = auth
            .register(RegisterInput {
                name: &user.name,
                email: &user.email,
                password: &user.password,
                password_confirm: &user.password,
            })
            .await
            .map_err(|e| CommandError::Seed(format!("user {}: {e}", user.email)))?;
        user_ids.insert(created.email.as_str().to_owned(), created.id);
    }

    let mut store_ids: HashMap<&str, StoreId> = HashMap::new();
    for store in &seed.stores {
        let author = lookup_user(&user_ids, &store.author)?;
        let input = StoreInput {
            name: store.name.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            address: store.address.clone(),
            longitude: store.lng.to_string(),
            latitude: store.lat.to_string(),
        };
        let created = stores
            .create_store(author, &input, None)
            .await
            .map_err(|e| CommandError::Seed(format!("store {}: {e}", store.name)))?;
        store_ids.insert(store.name.as_str(), created.id);
    }

    for review in &seed.reviews {
        let author = lookup_user(&user_ids, &review.author)?;
        let store = store_ids
            .get(review.store.as_str())
            .copied()
            .ok_or_else(|| CommandError::Seed(format!("unknown store {}", review.store)))?;
        stores
            .add_review(author, store, &review.text, &review.rating.to_string())
            .await
            .map_err(|e| CommandError::Seed(format!("review of {}: {e}", review.store)))?;
    }

    Ok(SeedSummary {
        users: seed.users.len(),
        stores: seed.stores.len(),
        reviews: seed.reviews.len(),
    })
}

/// Cross-reference problems in `seed`, one message each.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut emails = HashSet::new();
    for user in &seed.users {
        match normalized(&user.email) {
            Some(email) if !emails.insert(email.clone()) => {
                errors.push(format!("duplicate user {email}"));
            }
            Some(_) => {}
            None => errors.push(format!("invalid email {}", user.email)),
        }
    }

    let known_user = |email: &str| normalized(email).is_some_and(|e| emails.contains(&e));

    let mut names = HashSet::new();
    for store in &seed.stores {
        if !names.insert(store.name.as_str()) {
            errors.push(format!("duplicate store {}", store.name));
        }
        if !known_user(&store.author) {
            errors.push(format!("store {} has unknown author {}", store.name, store.author));
        }
    }

    for review in &seed.reviews {
        if !names.contains(review.store.as_str()) {
            errors.push(format!("review of unknown store {}", review.store));
        }
        if !known_user(&review.author) {
            errors.push(format!("review by unknown user {}", review.author));
        }
    }

    errors
}

fn normalized(email: &str) -> Option<String> {
    Email::parse_normalized(email)
        .ok()
        .map(|e| e.as_str().to_owned())
}

fn lookup_user(ids: &HashMap<String, UserId>, email: &str) -> Result<UserId, CommandError> {
    normalized(email)
        .and_then(|e| ids.get(&e).copied())
        .ok_or_else(|| CommandError::Seed(format!("unknown user {email}")))
}

async fn clear_directory(pool: &PgPool) -> Result<(), CommandError> {
    sqlx::query(
        r"
        TRUNCATE directory.user_heart, directory.review, directory.store, directory.user
        RESTART IDENTITY
        ",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../data/sample.yaml");

    #[test]
    fn test_sample_file_is_valid() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(!seed.stores.is_empty());
        assert_eq!(validate(&seed), Vec::<String>::new());
    }

    #[test]
    fn test_unknown_references_are_reported() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
users:
  - { name: Wes, email: Wes@GoogleMail.com, password: pw }
stores:
  - { name: Cafe, address: Here, lng: 1, lat: 2, author: wes@gmail.com }
  - { name: Bar, address: There, lng: 1, lat: 2, author: nobody@example.com }
reviews:
  - { store: Diner, author: wes@gmail.com, text: Good, rating: 4 }
",
        )
        .unwrap();

        assert_eq!(
            validate(&seed),
            [
                "store Bar has unknown author nobody@example.com",
                "review of unknown store Diner",
            ]
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<SeedFile, _> = serde_yaml::from_str("stores: []\nhearts: []\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_into_memory() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        let repos = Repos::in_memory();

        let summary = load(&repos, &seed).await.unwrap();
        assert_eq!(summary.stores, seed.stores.len());

        let stores = repos.stores.find_all().await.unwrap();
        let reviewed: usize = stores.iter().map(|s| s.reviews.len()).sum();
        assert_eq!(reviewed, seed.reviews.len());
    }
}
