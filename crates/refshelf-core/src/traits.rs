//! Core traits for refshelf abstractions.
//!
//! The ingestion pipeline is written against these traits. Postgres and
//! filesystem implementations live in `refshelf-db`, together with
//! in-memory implementations used by tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// COLLECTION DIRECTORY
// =============================================================================

/// Lookup of collections. Creation and sharing belong to another service;
/// `insert` exists for provisioning and fixtures.
#[async_trait]
pub trait CollectionDirectory: Send + Sync {
    /// Find a collection by its exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>>;

    /// Fetch a collection by id.
    async fn get(&self, id: Uuid) -> Result<Option<Collection>>;

    /// Register a collection.
    async fn insert(&self, name: &str, owner_id: Uuid) -> Result<Collection>;
}

// =============================================================================
// REFERENCE REPOSITORY
// =============================================================================

/// Repository for reference rows and their embedded attachment lists.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Persist a reference shell with no attachments.
    async fn insert(&self, req: NewReference) -> Result<Reference>;

    /// Fetch a reference by id.
    async fn fetch(&self, id: Uuid) -> Result<Option<Reference>>;

    /// Replace the attachment list of a reference.
    async fn set_attachments(&self, id: Uuid, attachments: &[Attachment]) -> Result<()>;

    /// Apply a partial update of scalar fields.
    async fn update_fields(&self, id: Uuid, update: ReferenceFieldUpdate) -> Result<()>;

    /// Delete a reference and its keyword links. Returns false if absent.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

// =============================================================================
// KEYWORD REPOSITORY
// =============================================================================

/// Repository for keywords and reference/keyword links.
#[async_trait]
pub trait KeywordRepository: Send + Sync {
    /// Find a keyword by its normalized text.
    async fn find_by_text(&self, text: &str) -> Result<Option<Keyword>>;

    /// Insert a keyword unless one with the same text exists.
    ///
    /// Returns `None` when another writer already owns the text; callers
    /// re-read with `find_by_text`.
    async fn insert_if_absent(&self, text: &str) -> Result<Option<Keyword>>;

    /// List all keywords ordered by text.
    async fn list(&self) -> Result<Vec<Keyword>>;

    /// Link a keyword to a reference. Returns false if the pair exists.
    async fn add_link(&self, link: ReferenceKeywordLink) -> Result<bool>;

    /// Remove every keyword link of a reference.
    async fn clear_links(&self, reference_id: Uuid) -> Result<u64>;

    /// Keywords linked to a reference, in link position order.
    async fn for_reference(&self, reference_id: Uuid) -> Result<Vec<Keyword>>;
}

// =============================================================================
// STORAGE
// =============================================================================

/// Opaque blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write data to the specified path, replacing nothing that exists
    /// elsewhere.
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Delete data at the specified path. Missing paths are not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Registry of storage roots in use (the "used root names" set).
#[async_trait]
pub trait RootRegistry: Send + Sync {
    /// Atomically reserve `root`. Returns false if it is already taken.
    async fn try_reserve(&self, root: &str) -> Result<bool>;

    /// Release a reservation. Releasing an unknown root is a no-op.
    async fn release(&self, root: &str) -> Result<()>;

    /// Whether `root` is currently reserved.
    async fn is_reserved(&self, root: &str) -> Result<bool>;
}

/// Log of blobs no attachment refers to, reconciled by the orphan sweep.
#[async_trait]
pub trait OrphanLog: Send + Sync {
    /// Record blobs as orphaned.
    async fn record(&self, orphans: Vec<NewOrphan>) -> Result<()>;

    /// Oldest entries first.
    async fn list(&self, limit: i64) -> Result<Vec<OrphanedBlob>>;

    /// Remove reconciled entries.
    async fn remove(&self, ids: &[Uuid]) -> Result<()>;

    /// Whether any entry is still logged under `root/`.
    async fn has_pending_under(&self, root: &str) -> Result<bool>;
}

// =============================================================================
// PREVIEW
// =============================================================================

/// External "render first page to image" service.
#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    /// Render the first page of a pdf to PNG bytes.
    async fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>>;
}
