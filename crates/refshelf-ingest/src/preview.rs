//! Preview artifacts for binary attachments.
//!
//! Images are their own preview. Pdfs get their first page rendered and
//! stored next to the collection's files; nothing else gets a preview.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use refshelf_core::{BlobStore, Error, PreviewRenderer, Result};

use crate::path_resolver::PlannedAttachment;
use crate::renderer::looks_like_pdf;

/// What the preview step produced for one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewArtifact {
    None,
    /// The image blobs themselves, in upload order.
    ImageSet(Vec<String>),
    /// A rendered first page stored at `path`.
    Rendered { path: String },
}

/// Derives previews through a [`PreviewRenderer`] and stores them.
#[derive(Clone)]
pub struct PreviewGenerator {
    renderer: Arc<dyn PreviewRenderer>,
    blobs: Arc<dyn BlobStore>,
}

impl PreviewGenerator {
    pub fn new(renderer: Arc<dyn PreviewRenderer>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { renderer, blobs }
    }

    /// Produce the preview of a planned attachment.
    ///
    /// For pdfs the rendered page is written to the planned preview path.
    /// On any failure nothing is left in the blob store.
    pub async fn preview(&self, attachment: &PlannedAttachment) -> Result<PreviewArtifact> {
        match attachment {
            PlannedAttachment::Image { blobs, .. } => Ok(PreviewArtifact::ImageSet(
                blobs.iter().map(|(path, _)| path.clone()).collect(),
            )),
            PlannedAttachment::Pdf {
                payload,
                preview_path,
                ..
            } => self.render_pdf(payload, preview_path).await,
            PlannedAttachment::Link { .. } | PlannedAttachment::File { .. } => {
                Ok(PreviewArtifact::None)
            }
        }
    }

    async fn render_pdf(&self, pdf: &[u8], preview_path: &str) -> Result<PreviewArtifact> {
        let start = Instant::now();
        if pdf.is_empty() || !looks_like_pdf(pdf) {
            return Err(Error::Render("no first page: not a PDF".to_string()));
        }

        let png = self.renderer.render_first_page(pdf).await.map_err(|e| match e {
            Error::Render(_) => e,
            other => Error::Render(other.to_string()),
        })?;
        if png.is_empty() {
            return Err(Error::Render("renderer returned an empty page".to_string()));
        }

        if let Err(e) = self.blobs.put(preview_path, &png).await {
            if let Err(cleanup) = self.blobs.delete(preview_path).await {
                warn!(
                    subsystem = "ingest",
                    component = "preview",
                    storage_path = %preview_path,
                    error = %cleanup,
                    "Failed to remove partial preview"
                );
            }
            return Err(match e {
                Error::Storage(_) => e,
                other => Error::Storage(other.to_string()),
            });
        }

        debug!(
            subsystem = "ingest",
            component = "preview",
            op = "render",
            storage_path = %preview_path,
            size_bytes = png.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Stored pdf preview"
        );
        Ok(PreviewArtifact::Rendered {
            path: preview_path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_resolver::StorageLocation;
    use crate::renderer::StaticRenderer;
    use refshelf_db::MemoryBlobStore;

    fn pdf_plan(payload: &[u8]) -> PlannedAttachment {
        PlannedAttachment::Pdf {
            stored_path: "Papers/files/1_a.pdf".to_string(),
            display_name: "a.pdf".to_string(),
            preview_path: "Papers/previews/1_a.png".to_string(),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_pdf_preview_is_rendered_and_stored() {
        let blobs = MemoryBlobStore::new();
        let generator = PreviewGenerator::new(
            Arc::new(StaticRenderer::new(b"png".to_vec())),
            Arc::new(blobs.clone()),
        );

        let artifact = generator.preview(&pdf_plan(b"%PDF-1.4")).await.unwrap();
        assert_eq!(
            artifact,
            PreviewArtifact::Rendered {
                path: "Papers/previews/1_a.png".to_string()
            }
        );
        assert_eq!(blobs.get("Papers/previews/1_a.png"), Some(b"png".to_vec()));
        // The pdf itself is written by the caller, after the preview.
        assert!(blobs.get("Papers/files/1_a.pdf").is_none());
    }

    #[tokio::test]
    async fn test_empty_pdf_is_render_failure() {
        let blobs = MemoryBlobStore::new();
        let generator = PreviewGenerator::new(
            Arc::new(StaticRenderer::new(b"png".to_vec())),
            Arc::new(blobs.clone()),
        );

        let err = generator.preview(&pdf_plan(b"")).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert!(blobs.paths().is_empty());
    }

    #[tokio::test]
    async fn test_failed_preview_write_leaves_nothing() {
        let blobs = MemoryBlobStore::new();
        blobs.fail_puts_containing("previews/");
        let generator = PreviewGenerator::new(
            Arc::new(StaticRenderer::new(b"png".to_vec())),
            Arc::new(blobs.clone()),
        );

        let err = generator.preview(&pdf_plan(b"%PDF-1.4")).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(blobs.paths().is_empty());
    }

    #[tokio::test]
    async fn test_image_and_file_previews() {
        let generator = PreviewGenerator::new(
            Arc::new(StaticRenderer::failing()),
            Arc::new(MemoryBlobStore::new()),
        );

        let image = PlannedAttachment::Image {
            location: StorageLocation {
                root: "Papers/Survey".to_string(),
                display_name: "Survey".to_string(),
            },
            blobs: vec![("Papers/Survey/0.png".to_string(), vec![1])],
        };
        assert_eq!(
            generator.preview(&image).await.unwrap(),
            PreviewArtifact::ImageSet(vec!["Papers/Survey/0.png".to_string()])
        );

        let file = PlannedAttachment::File {
            stored_path: "Papers/files/1_a.txt".to_string(),
            display_name: "a.txt".to_string(),
            payload: vec![1],
        };
        assert_eq!(generator.preview(&file).await.unwrap(), PreviewArtifact::None);
    }
}
