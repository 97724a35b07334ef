//! # refshelf-ingest
//!
//! Reference ingestion and attachment pipeline.
//!
//! This crate provides:
//! - Collision-free storage path resolution for attachments
//! - Preview generation (pdf first page through `pdftoppm`)
//! - A caching keyword index with a bounded, deduplicated policy
//! - The reference assembler orchestrating create, update and delete
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use refshelf_ingest::{IngestConfig, IngestStores, PdftoppmRenderer, ReferenceAssembler};
//! use refshelf_db::{Database, FilesystemBackend};
//!
//! let db = Database::connect("postgres://...").await?;
//! let stores = IngestStores::from_database(
//!     &db,
//!     Arc::new(FilesystemBackend::new("/var/lib/refshelf/files")),
//!     Arc::new(PdftoppmRenderer::default()),
//! );
//! let assembler = ReferenceAssembler::new(stores, IngestConfig::default());
//! let detail = assembler.create(request).await?;
//! ```

pub mod assembler;
pub mod keyword_index;
pub mod path_resolver;
pub mod preview;
pub mod renderer;

// Re-export core types
pub use refshelf_core::*;

pub use assembler::{IngestConfig, IngestStores, ReferenceAssembler, DEFAULT_SWEEP_BATCH};
pub use keyword_index::{KeywordIndex, LinkOutcome};
pub use path_resolver::{PathResolver, PlannedAttachment, StorageLocation, SuffixCursor};
pub use preview::{PreviewArtifact, PreviewGenerator};
pub use renderer::{PdftoppmRenderer, StaticRenderer};
