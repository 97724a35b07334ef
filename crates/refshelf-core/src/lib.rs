//! # refshelf-core
//!
//! Core types, traits, and ingestion policies for refshelf.
//!
//! This crate holds the data model (collections, references, attachments,
//! keywords), the collaborator traits the ingestion pipeline is written
//! against, and the pure policies that need no I/O: attachment
//! classification, keyword normalization, and file safety checks.

pub mod classifier;
pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod keywords;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use classifier::{classify, classify_all, ClassifiedAttachment, PayloadLimits};
pub use error::{ClassificationError, Error, IngestError, IngestStage, Result};
pub use file_safety::{sanitize_filename, validate_file, ValidationResult};
pub use keywords::{normalize_keyword, tokenize_keywords};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
