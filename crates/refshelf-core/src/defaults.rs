//! Centralized default constants for refshelf.
//!
//! All crates reference these constants instead of defining their own
//! magic numbers. Organized by domain area.

// =============================================================================
// KEYWORDS
// =============================================================================

/// Maximum keywords linked to one reference per ingestion call.
pub const MAX_KEYWORDS: usize = 10;

/// Maximum characters of a stored keyword (longer input is truncated).
pub const MAX_KEYWORD_CHARS: usize = 15;

/// Entries kept in the keyword id cache.
pub const KEYWORD_CACHE_SIZE: usize = 1000;

// =============================================================================
// STORAGE
// =============================================================================

/// Default blob storage directory.
pub const FILE_STORAGE_PATH: &str = "/var/lib/refshelf/files";

/// Maximum size of a single attachment payload (25 MiB).
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Directory segment under a collection for pdf/file blobs.
pub const FILES_SEGMENT: &str = "files";

/// Directory segment under a collection for rendered previews.
pub const PREVIEWS_SEGMENT: &str = "previews";

/// Slug used when a collection name or title has no usable characters.
pub const EMPTY_SLUG: &str = "untitled";

// =============================================================================
// INGESTION
// =============================================================================

/// Concurrent blob writes / preview renders within one ingestion call.
pub const INGEST_CONCURRENCY: usize = 4;

// =============================================================================
// PREVIEW
// =============================================================================

/// Renderer binary used for pdf previews.
pub const PDFTOPPM_PATH: &str = "pdftoppm";

/// Resolution of rendered pdf previews.
pub const PREVIEW_DPI: u32 = 72;

/// Timeout for one preview render.
pub const PREVIEW_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/refshelf";

/// Maximum request body size. Payloads travel base64-encoded (~4/3 overhead).
pub const REQUEST_BODY_LIMIT: usize = 128 * 1024 * 1024;
