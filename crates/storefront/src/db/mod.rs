//! Database connection for the storefront session store.
//!
//! # Database: `webcommerce_storefront`
//!
//! Products, orders and accounts belong to the backend. The only local table
//! is `tower_sessions.session`, holding visitor sessions (auth state and
//! cart). It is created by:
//! ```bash
//! cargo run -p webcommerce-cli -- migrate sessions
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
