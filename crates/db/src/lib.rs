//! Persistence layer for Gatehouse.
//!
//! - [`models`] -- row structs and insert DTOs.
//! - [`repositories`] -- zero-sized PostgreSQL repositories taking `&PgPool`.
//! - [`store`] -- the [`CredentialStore`](store::CredentialStore) and
//!   [`SessionStore`](store::SessionStore) traits the auth flows are written
//!   against, with PostgreSQL and in-memory implementations.

pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
