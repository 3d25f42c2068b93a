//! Durable storage for users, chat messages, and call records.
//!
//! [`PgStore`] implements the `parley-core` store traits on Postgres via the
//! zero-sized repositories in [`repositories`]. [`MemoryStore`] implements the
//! same traits in process for tests and database-less dev runs.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;

pub use memory::MemoryStore;
pub use pg_store::PgStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// New store-assigned identifier (time-ordered UUIDv7).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
