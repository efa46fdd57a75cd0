//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! webcommerce-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the
//!   storefront session store (falls back to `DATABASE_URL`)

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or migration error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Result<String, MigrationError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Create the session schema and table.
///
/// Idempotent: existing tables are left as they are.
///
/// # Errors
///
/// Returns an error if the URL is missing or the database refuses the DDL.
pub async fn sessions() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();
    let url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(&url).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session migration complete!");
    Ok(())
}
