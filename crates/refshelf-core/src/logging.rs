//! Structured logging field name constants for refshelf.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, skipped keyword, orphaned blob |
//! | INFO  | Lifecycle events, committed ingestions |
//! | DEBUG | Stage transitions, resolved paths, config choices |
//! | TRACE | Per-item iteration (each blob, each keyword) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → pipeline.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "ingest", "db", "storage"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "assembler", "path_resolver", "keyword_index", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "resolve", "sweep"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Reference UUID being operated on.
pub const REFERENCE_ID: &str = "reference_id";

/// Collection UUID or name.
pub const COLLECTION: &str = "collection";

/// Ingestion stage (see `IngestStage`).
pub const STAGE: &str = "stage";

/// Storage path or root.
pub const STORAGE_PATH: &str = "storage_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of attachments in a call.
pub const ATTACHMENT_COUNT: &str = "attachment_count";

/// Number of keyword links created.
pub const KEYWORD_COUNT: &str = "keyword_count";

/// Byte length of a payload.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
