//! PostgreSQL persistence for the Perfolio profile service.
//!
//! Repositories hold the SQL; [`stores`] adapts them to the storage seams
//! defined in `perfolio-core`.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod stores;

pub use stores::{PgUserDirectory, PgWidgetStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `db/migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
