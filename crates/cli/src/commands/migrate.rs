//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! shipquote migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Schema migrations live in `crates/storefront/migrations/`. The session
//! table is owned by `tower-sessions-sqlx-store` and created by its own
//! migration.

use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use shipquote_storefront::db;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails.
pub async fn storefront() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Running session store migration...");
    PostgresStore::new(pool.clone()).migrate().await?;

    info!("Storefront migrations complete!");
    Ok(())
}
