//! Database migration command.
//!
//! Migrations live in `crates/web/migrations/` and are embedded at build
//! time. They create the `directory` schema (users, stores, reviews, hearts)
//! and the `tower_sessions.session` table.

use delicious_web::db;

use super::{CommandError, database_url};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
