//! Data model for collections, references, attachments and keywords.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// COLLECTIONS
// =============================================================================

/// A named grouping of references owned by a user.
///
/// Collections are managed outside the ingestion pipeline; the pipeline
/// only looks them up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    /// Unique within the owner's scope.
    pub name: String,
    pub owner_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Discriminator of an attachment descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Link,
    Image,
    Pdf,
    File,
}

impl FileType {
    /// Whether attachments of this kind carry binary payloads.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Self::Link)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Image => write!(f, "image"),
            Self::Pdf => write!(f, "pdf"),
            Self::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link" => Ok(Self::Link),
            "image" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "file" => Ok(Self::File),
            _ => Err(format!("Invalid file type: {}", s)),
        }
    }
}

/// One piece of content attached to a reference.
///
/// Serialized with a `fileType` tag, e.g.
/// `{"fileType":"pdf","storedPath":"...","displayName":"...","previewPath":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "fileType",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum Attachment {
    Link {
        url: String,
    },
    Image {
        /// Storage root of the image set.
        stored_path: String,
        display_name: String,
        /// Blob paths under `stored_path`, in upload order.
        source_images: Vec<String>,
    },
    Pdf {
        stored_path: String,
        display_name: String,
        preview_path: String,
    },
    File {
        stored_path: String,
        display_name: String,
    },
}

impl Attachment {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Link { .. } => FileType::Link,
            Self::Image { .. } => FileType::Image,
            Self::Pdf { .. } => FileType::Pdf,
            Self::File { .. } => FileType::File,
        }
    }

    /// Every blob path this attachment refers to (previews included).
    pub fn blob_paths(&self) -> Vec<&str> {
        match self {
            Self::Link { .. } => Vec::new(),
            Self::Image { source_images, .. } => {
                source_images.iter().map(String::as_str).collect()
            }
            Self::Pdf {
                stored_path,
                preview_path,
                ..
            } => vec![stored_path.as_str(), preview_path.as_str()],
            Self::File { stored_path, .. } => vec![stored_path.as_str()],
        }
    }

    /// The reserved storage root, for image sets.
    pub fn image_root(&self) -> Option<&str> {
        match self {
            Self::Image { stored_path, .. } => Some(stored_path),
            _ => None,
        }
    }
}

/// Raw attachment descriptor as received from a client.
///
/// Binary payloads are base64 encoded (a `data:` URL prefix is accepted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    /// `link | image | pdf | file`; anything else is rejected.
    pub file_type: String,
    /// Original filename, or the URL for links.
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub image_list: Option<Vec<String>>,
    /// MIME type declared by the upstream transport, when known.
    #[serde(default)]
    pub mime_type: Option<String>,
}

// =============================================================================
// REFERENCES
// =============================================================================

/// A saved item inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub title: String,
    pub memo: String,
    pub attachments: Vec<Attachment>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// A reference assembled with its resolved keyword texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDetail {
    #[serde(flatten)]
    pub reference: Reference,
    pub collection_name: String,
    /// Keyword texts in link order.
    pub keywords: Vec<String>,
}

/// Body of a create or update call.
///
/// Every field is optional at the type level so that validation can report
/// which required field is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequest {
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    /// Whitespace-separated keyword string.
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<AttachmentInput>>,
}

/// Fields of a new reference shell.
#[derive(Debug, Clone)]
pub struct NewReference {
    pub collection_id: Uuid,
    pub title: String,
    pub memo: String,
}

/// Partial update of a reference's scalar fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFieldUpdate {
    pub collection_id: Option<Uuid>,
    pub title: Option<String>,
    pub memo: Option<String>,
}

impl ReferenceFieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.collection_id.is_none() && self.title.is_none() && self.memo.is_none()
    }
}

// =============================================================================
// KEYWORDS
// =============================================================================

/// Stable identifier of a keyword.
pub type KeywordId = Uuid;

/// A short, deduplicated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: KeywordId,
    /// Normalized text, unique across all keywords.
    pub text: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Join row between a reference and a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceKeywordLink {
    pub reference_id: Uuid,
    pub keyword_id: KeywordId,
    /// Token position within the ingestion call.
    pub position: i32,
}

// =============================================================================
// ORPHANED BLOBS
// =============================================================================

/// Why a blob is no longer referenced by any attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// Written by an ingestion call that later failed.
    FailedIngestion,
    /// Its attachment was replaced by an update.
    ReplacedOnUpdate,
    /// Its reference was deleted and the blob delete failed.
    ReferenceDeleted,
}

impl std::fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailedIngestion => write!(f, "failed_ingestion"),
            Self::ReplacedOnUpdate => write!(f, "replaced_on_update"),
            Self::ReferenceDeleted => write!(f, "reference_deleted"),
        }
    }
}

impl std::str::FromStr for OrphanReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "failed_ingestion" => Ok(Self::FailedIngestion),
            "replaced_on_update" => Ok(Self::ReplacedOnUpdate),
            "reference_deleted" => Ok(Self::ReferenceDeleted),
            _ => Err(format!("Invalid orphan reason: {}", s)),
        }
    }
}

/// Blob to be recorded in the orphan log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrphan {
    pub path: String,
    pub reason: OrphanReason,
    pub reference_id: Option<Uuid>,
}

/// Entry of the orphan log, reconciled by the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedBlob {
    pub id: Uuid,
    pub path: String,
    pub reason: OrphanReason,
    pub reference_id: Option<Uuid>,
    pub recorded_at_utc: DateTime<Utc>,
}

/// Outcome of an orphan sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Blobs deleted (or already gone) and removed from the log.
    pub swept: usize,
    /// Blobs whose delete failed; they stay in the log.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_str_is_case_insensitive() {
        assert_eq!("PDF".parse::<FileType>().unwrap(), FileType::Pdf);
        assert_eq!(" link ".parse::<FileType>().unwrap(), FileType::Link);
        assert!("video".parse::<FileType>().is_err());
    }

    #[test]
    fn test_file_type_is_binary() {
        assert!(!FileType::Link.is_binary());
        assert!(FileType::Image.is_binary());
        assert!(FileType::Pdf.is_binary());
        assert!(FileType::File.is_binary());
    }

    #[test]
    fn test_attachment_serializes_with_file_type_tag() {
        let attachment = Attachment::Pdf {
            stored_path: "papers/files/1_a.pdf".to_string(),
            display_name: "a.pdf".to_string(),
            preview_path: "papers/previews/1_a.png".to_string(),
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["fileType"], "pdf");
        assert_eq!(json["storedPath"], "papers/files/1_a.pdf");
        assert_eq!(json["previewPath"], "papers/previews/1_a.png");

        let back: Attachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, attachment);
    }

    #[test]
    fn test_link_attachment_json_shape() {
        let json = serde_json::to_string(&Attachment::Link {
            url: "https://arxiv.org/abs/1".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"fileType":"link","url":"https://arxiv.org/abs/1"}"#);
    }

    #[test]
    fn test_blob_paths_per_kind() {
        let image = Attachment::Image {
            stored_path: "p/s".to_string(),
            display_name: "Survey".to_string(),
            source_images: vec!["p/s/0.png".to_string(), "p/s/1.png".to_string()],
        };
        assert_eq!(image.blob_paths(), vec!["p/s/0.png", "p/s/1.png"]);
        assert_eq!(image.image_root(), Some("p/s"));

        let link = Attachment::Link {
            url: "https://example.com".to_string(),
        };
        assert!(link.blob_paths().is_empty());
        assert_eq!(link.image_root(), None);
    }

    #[test]
    fn test_reference_request_deserializes_camel_case() {
        let req: ReferenceRequest = serde_json::from_str(
            r#"{"collectionName":"Papers","title":"Survey","keywords":"nlp",
                "files":[{"fileType":"link","originalName":"https://arxiv.org/abs/1"}]}"#,
        )
        .unwrap();
        assert_eq!(req.collection_name.as_deref(), Some("Papers"));
        assert_eq!(req.memo, None);
        let files = req.files.unwrap();
        assert_eq!(files[0].file_type, "link");
        assert_eq!(
            files[0].original_name.as_deref(),
            Some("https://arxiv.org/abs/1")
        );
    }

    #[test]
    fn test_orphan_reason_round_trips_through_display() {
        for reason in [
            OrphanReason::FailedIngestion,
            OrphanReason::ReplacedOnUpdate,
            OrphanReason::ReferenceDeleted,
        ] {
            assert_eq!(reason.to_string().parse::<OrphanReason>().unwrap(), reason);
        }
    }

    #[test]
    fn test_field_update_is_empty() {
        assert!(ReferenceFieldUpdate::default().is_empty());
        let update = ReferenceFieldUpdate {
            title: Some("New".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
