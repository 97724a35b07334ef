//! Attachment classification.
//!
//! Turns a raw [`AttachmentInput`] into a [`ClassifiedAttachment`] by
//! dispatching on its `fileType` discriminator. No content sniffing and no
//! I/O: payloads are only decoded and checked against the size limit and
//! the file safety rules.

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::defaults::MAX_UPLOAD_BYTES;
use crate::error::ClassificationError;
use crate::file_safety::validate_file;
use crate::models::{AttachmentInput, FileType};

const PDF_MIME: &str = "application/pdf";
const DEFAULT_PDF_NAME: &str = "document.pdf";
const DEFAULT_FILE_NAME: &str = "unnamed_file";

/// Limits applied to decoded payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    /// Maximum decoded size of a single payload or image.
    pub max_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// An attachment whose kind is known and whose payloads are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedAttachment {
    Link { url: String },
    /// One logical image set; every entry becomes one blob under one root.
    Image { images: Vec<Vec<u8>> },
    Pdf { original_name: String, payload: Vec<u8> },
    File { original_name: String, payload: Vec<u8> },
}

impl ClassifiedAttachment {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Link { .. } => FileType::Link,
            Self::Image { .. } => FileType::Image,
            Self::Pdf { .. } => FileType::Pdf,
            Self::File { .. } => FileType::File,
        }
    }

    /// Total decoded payload size.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Link { .. } => 0,
            Self::Image { images } => images.iter().map(Vec::len).sum(),
            Self::Pdf { payload, .. } | Self::File { payload, .. } => payload.len(),
        }
    }
}

/// Classify the attachment at position `index` of a request.
pub fn classify(
    index: usize,
    input: &AttachmentInput,
    limits: &PayloadLimits,
) -> Result<ClassifiedAttachment, ClassificationError> {
    let file_type: FileType =
        input
            .file_type
            .parse()
            .map_err(|_| ClassificationError::UnsupportedFileType {
                index,
                file_type: input.file_type.clone(),
            })?;

    match file_type {
        FileType::Link => {
            let url = non_empty(input.original_name.as_deref())
                .or_else(|| non_empty(input.payload.as_deref()))
                .unwrap_or_default()
                .to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClassificationError::InvalidLinkFormat { index, value: url });
            }
            Ok(ClassifiedAttachment::Link { url })
        }
        FileType::Image => {
            let encoded: Vec<&str> = match input.image_list.as_deref() {
                Some(list) if !list.is_empty() => list.iter().map(String::as_str).collect(),
                _ => non_empty(input.payload.as_deref()).into_iter().collect(),
            };
            if encoded.is_empty() {
                return Err(ClassificationError::MissingPayload { index, file_type });
            }
            let images = encoded
                .into_iter()
                .map(|data| decode_payload(index, file_type, data, limits))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ClassifiedAttachment::Image { images })
        }
        FileType::Pdf => {
            let encoded = non_empty(input.payload.as_deref())
                .ok_or(ClassificationError::MissingPayload { index, file_type })?;
            if let Some(declared) = non_empty(input.mime_type.as_deref()) {
                if !is_pdf_mime(declared) {
                    return Err(ClassificationError::UnsupportedMediaType {
                        index,
                        declared: declared.to_string(),
                    });
                }
            }
            let payload = decode_payload(index, file_type, encoded, limits)?;
            let original_name = non_empty(input.original_name.as_deref())
                .unwrap_or(DEFAULT_PDF_NAME)
                .to_string();
            Ok(ClassifiedAttachment::Pdf {
                original_name,
                payload,
            })
        }
        FileType::File => {
            let encoded = non_empty(input.payload.as_deref())
                .ok_or(ClassificationError::MissingPayload { index, file_type })?;
            let payload = decode_payload(index, file_type, encoded, limits)?;
            let original_name = non_empty(input.original_name.as_deref())
                .unwrap_or(DEFAULT_FILE_NAME)
                .to_string();
            let safety = validate_file(&original_name, &payload);
            if !safety.allowed {
                return Err(ClassificationError::BlockedFile {
                    index,
                    reason: safety
                        .block_reason
                        .unwrap_or_else(|| "file type is not allowed".to_string()),
                });
            }
            Ok(ClassifiedAttachment::File {
                original_name,
                payload,
            })
        }
    }
}

/// Classify a whole batch in input order. The first failure wins.
pub fn classify_all(
    inputs: &[AttachmentInput],
    limits: &PayloadLimits,
) -> Result<Vec<ClassifiedAttachment>, ClassificationError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| classify(index, input, limits))
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| {
            debug!(
                subsystem = "ingest",
                component = "classifier",
                count = inputs.len(),
                error = %e,
                "Attachment rejected"
            )
        })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `application/pdf`, ignoring case and parameters.
fn is_pdf_mime(declared: &str) -> bool {
    declared
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false)
}

fn decode_payload(
    index: usize,
    file_type: FileType,
    encoded: &str,
    limits: &PayloadLimits,
) -> Result<Vec<u8>, ClassificationError> {
    let body = match encoded.split_once(";base64,") {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => encoded,
    };
    let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|_| ClassificationError::InvalidPayloadEncoding { index })?;
    if bytes.is_empty() {
        return Err(ClassificationError::MissingPayload { index, file_type });
    }
    if bytes.len() > limits.max_bytes {
        return Err(ClassificationError::PayloadTooLarge {
            index,
            size: bytes.len(),
            limit: limits.max_bytes,
        });
    }
    Ok(bytes)
}
