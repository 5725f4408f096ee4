//! # ideabase-db
//!
//! PostgreSQL database layer and object storage for IdeaBase.
//!
//! This crate provides:
//! - Connection pool management
//! - Owner-scoped repositories for notes, attachments, tags and accounts
//! - Object storage backends (filesystem, HTTP object store)
//! - In-memory mocks of all of the above behind the `mock` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideabase_db::{CreateNoteRequest, Database, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/ideabase").await?;
//!
//!     let note = db.notes.insert(owner_id, CreateNoteRequest {
//!         title: "Groceries".to_string(),
//!         content: "<p>eggs</p>".to_string(),
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod accounts;
pub mod attachments;
pub mod file_storage;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod notes;
pub mod pool;
pub mod tags;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use ideabase_core::*;

pub use accounts::PgAccountRepository;
pub use attachments::PgAttachmentRepository;
pub use file_storage::{
    validate_key, FilesystemBackend, HttpObjectStore, HttpStoreConfig, StorageBackend,
};
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use tags::{validate_tag_color, validate_tag_name, PgTagRepository};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub notes: Arc<PgNoteRepository>,
    pub attachments: Arc<PgAttachmentRepository>,
    pub tags: Arc<PgTagRepository>,
    pub accounts: Arc<PgAccountRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self::with_session_ttl(pool, chrono::Duration::hours(defaults::SESSION_TTL_HOURS))
    }

    /// Create a Database whose account repository issues sessions valid for `ttl`.
    pub fn with_session_ttl(pool: sqlx::Pool<sqlx::Postgres>, ttl: chrono::Duration) -> Self {
        Self {
            notes: Arc::new(PgNoteRepository::new(pool.clone())),
            attachments: Arc::new(PgAttachmentRepository::new(pool.clone())),
            tags: Arc::new(PgTagRepository::new(pool.clone())),
            accounts: Arc::new(PgAccountRepository::new(pool.clone()).with_session_ttl(ttl)),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Cheap liveness probe.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
