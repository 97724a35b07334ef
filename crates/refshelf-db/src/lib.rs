//! # refshelf-db
//!
//! PostgreSQL and filesystem storage for refshelf.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for collections, references, keywords,
//!   storage roots and the orphaned blob log
//! - A filesystem blob store
//! - In-memory implementations of the same traits for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use refshelf_db::{Database, CollectionDirectory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/refshelf").await?;
//!     let papers = db.collections.find_by_name("Papers").await?;
//!     println!("{:?}", papers);
//!     Ok(())
//! }
//! ```
pub mod collections;
pub mod file_storage;
pub mod keywords;
pub mod memory;
pub mod pool;
pub mod references;
pub mod storage_roots;

// Always compiled so integration tests (in tests/) can use it
pub mod test_fixtures;

// Re-export core types
pub use refshelf_core::*;

pub use collections::PgCollectionDirectory;
pub use file_storage::FilesystemBackend;
pub use keywords::PgKeywordRepository;
pub use memory::{MemoryBlobStore, MemoryStore};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use references::PgReferenceRepository;
pub use storage_roots::{PgOrphanLog, PgRootRegistry};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Collection lookup.
    pub collections: PgCollectionDirectory,
    /// References and their embedded attachments.
    pub references: PgReferenceRepository,
    /// Keywords and reference/keyword links.
    pub keywords: PgKeywordRepository,
    /// Reserved image storage roots.
    pub roots: PgRootRegistry,
    /// Blobs awaiting the orphan sweep.
    pub orphans: PgOrphanLog,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            collections: PgCollectionDirectory::new(pool.clone()),
            references: PgReferenceRepository::new(pool.clone()),
            keywords: PgKeywordRepository::new(pool.clone()),
            roots: PgRootRegistry::new(pool.clone()),
            orphans: PgOrphanLog::new(pool.clone()),
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
}
