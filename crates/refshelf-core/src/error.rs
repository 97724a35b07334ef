//! Error types for refshelf.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::FileType;

/// Result type alias using refshelf's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for refshelf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A required field is missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Collection lookup by name failed
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Reference not found
    #[error("Reference not found: {0}")]
    ReferenceNotFound(Uuid),

    /// An attachment failed classification
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// Blob store write/delete failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Preview rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Keyword resolution failed (never aborts an ingestion)
    #[error("Keyword error: {0}")]
    Keyword(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Reasons an attachment descriptor is rejected before any I/O happens.
///
/// `index` is the zero-based position of the attachment in the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("attachment {index}: invalid link format '{value}' (links must start with http:// or https://)")]
    InvalidLinkFormat { index: usize, value: String },

    #[error("attachment {index}: {file_type} attachment is missing its payload")]
    MissingPayload { index: usize, file_type: FileType },

    #[error("attachment {index}: unsupported media type '{declared}' for a pdf attachment")]
    UnsupportedMediaType { index: usize, declared: String },

    #[error("attachment {index}: unsupported file type '{file_type}'")]
    UnsupportedFileType { index: usize, file_type: String },

    #[error("attachment {index}: payload is not valid base64")]
    InvalidPayloadEncoding { index: usize },

    #[error("attachment {index}: payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { index: usize, size: usize, limit: usize },

    #[error("attachment {index}: {reason}")]
    BlockedFile { index: usize, reason: String },
}

/// Stages of one ingestion call, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Validating,
    CollectionResolved,
    ReferenceCreated,
    AttachmentsProcessing,
    KeywordsProcessing,
    Committed,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validating => write!(f, "validating"),
            Self::CollectionResolved => write!(f, "collection_resolved"),
            Self::ReferenceCreated => write!(f, "reference_created"),
            Self::AttachmentsProcessing => write!(f, "attachments_processing"),
            Self::KeywordsProcessing => write!(f, "keywords_processing"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

/// Terminal failure of an ingestion call: the stage it failed in and why.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct IngestError {
    pub stage: IngestStage,
    #[source]
    pub error: Error,
}

impl IngestError {
    pub fn new(stage: IngestStage, error: impl Into<Error>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("title is required".to_string());
        assert_eq!(err.to_string(), "Validation error: title is required");
    }

    #[test]
    fn test_error_display_collection_not_found() {
        let err = Error::CollectionNotFound("Papers".to_string());
        assert_eq!(err.to_string(), "Collection not found: Papers");
    }

    #[test]
    fn test_error_display_reference_not_found() {
        let id = Uuid::nil();
        let err = Error::ReferenceNotFound(id);
        assert_eq!(err.to_string(), format!("Reference not found: {}", id));
    }

    #[test]
    fn test_classification_error_is_transparent() {
        let err: Error = ClassificationError::InvalidLinkFormat {
            index: 0,
            value: "ftp://example.com".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "attachment 0: invalid link format 'ftp://example.com' (links must start with http:// or https://)"
        );
    }

    #[test]
    fn test_missing_payload_names_kind() {
        let err = ClassificationError::MissingPayload {
            index: 2,
            file_type: FileType::Pdf,
        };
        assert_eq!(
            err.to_string(),
            "attachment 2: pdf attachment is missing its payload"
        );
    }

    #[test]
    fn test_ingest_error_display_includes_stage() {
        let err = IngestError::new(
            IngestStage::CollectionResolved,
            Error::CollectionNotFound("Papers".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "collection_resolved failed: Collection not found: Papers"
        );
    }

    #[test]
    fn test_ingest_stage_serializes_snake_case() {
        let json = serde_json::to_string(&IngestStage::AttachmentsProcessing).unwrap();
        assert_eq!(json, "\"attachments_processing\"");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
        assert_send::<IngestError>();
    }
}
