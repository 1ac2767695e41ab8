//! TFM Store - SQLite document store
//!
//! SQLite-based persistence for:
//! - Audit documents (`Auditorias`)
//! - Draft documents (`Borradores`)
//! - Per-scope sequence counters
//!
//! ## Architecture
//!
//! This crate implements the `IDocumentStore` port from `tfm-core` using
//! SQLite as the storage backend. It is a driven (secondary) adapter in the
//! hexagonal architecture. Documents are kept as JSON text and queried with
//! SQLite's JSON functions, so the stored layout is the one the domain
//! serializes.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteDocumentStore`] - Full `IDocumentStore` implementation
//! - [`ReconnectPolicy`] - Exponential backoff while the database is unreachable
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use tfm_core::config::StoreConfig;
//! use tfm_store::{DatabasePool, SqliteDocumentStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(&StoreConfig::default()).await?;
//! let store = SqliteDocumentStore::new(pool.pool().clone());
//! // Use store as IDocumentStore...
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod pool;
pub mod repository;

pub use connection::ReconnectPolicy;
pub use pool::DatabasePool;
pub use repository::SqliteDocumentStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A filter, sort or patch cannot be expressed as a query
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
