//! Storage layer: entity models, storage capability traits and the two
//! backends that implement them.
//!
//! - [`store::MemStore`] keeps everything in process memory (development,
//!   tests, single-node deployments without `DATABASE_URL`).
//! - [`store::PgStore`] persists to PostgreSQL through the zero-sized
//!   repositories in [`repositories`].
//!
//! The backend is chosen once at startup and handed to the protocol services
//! as [`Stores`].

pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use error::{StoreError, StoreResult};
pub use store::{
    DeviceStore, MemStore, NonceStore, PgStore, SessionStore, StoreHealth, Stores, TrustStore,
};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
