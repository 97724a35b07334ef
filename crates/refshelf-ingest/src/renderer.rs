//! First-page PDF rendering.
//!
//! Pipeline: PDF bytes → temp file → `pdftoppm -png -f 1 -l 1 -singlefile`
//! → PNG bytes. The external command runs under a timeout.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tracing::debug;

use refshelf_core::defaults::{PDFTOPPM_PATH, PREVIEW_DPI, PREVIEW_TIMEOUT_SECS};
use refshelf_core::{Error, PreviewRenderer, Result};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Whether `data` starts like a PDF document.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// Renders the first page of a PDF with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(PDFTOPPM_PATH),
            dpi: PREVIEW_DPI,
            timeout: Duration::from_secs(PREVIEW_TIMEOUT_SECS),
        }
    }
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a command that writes to files rather than stdout.
    async fn run(&self, cmd: &mut Command) -> Result<()> {
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::Render(format!(
                    "pdftoppm timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Render(format!("Failed to execute pdftoppm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Render(format!(
                "pdftoppm failed (exit {}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PreviewRenderer for PdftoppmRenderer {
    async fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        if !looks_like_pdf(pdf) {
            return Err(Error::Render("no first page: not a PDF".to_string()));
        }

        let mut input = NamedTempFile::new()
            .map_err(|e| Error::Render(format!("Failed to create temp file: {}", e)))?;
        input
            .write_all(pdf)
            .map_err(|e| Error::Render(format!("Failed to write temp file: {}", e)))?;

        let out_dir = TempDir::new()
            .map_err(|e| Error::Render(format!("Failed to create temp dir: {}", e)))?;
        let out_prefix = out_dir.path().join("preview");

        debug!(
            subsystem = "ingest",
            component = "renderer",
            dpi = self.dpi,
            size_bytes = pdf.len(),
            "Rendering first page"
        );

        self.run(
            Command::new(&self.binary)
                .arg("-png")
                .arg("-f")
                .arg("1")
                .arg("-l")
                .arg("1")
                .arg("-singlefile")
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg(input.path())
                .arg(&out_prefix),
        )
        .await?;

        // -singlefile writes exactly `{prefix}.png`
        let png = tokio::fs::read(out_prefix.with_extension("png"))
            .await
            .map_err(|e| Error::Render(format!("pdftoppm produced no page: {}", e)))?;
        if png.is_empty() {
            return Err(Error::Render("pdftoppm produced an empty page".to_string()));
        }
        Ok(png)
    }
}

/// Renderer returning fixed bytes, or failing on demand.
///
/// For tests and for running without poppler installed.
#[derive(Debug, Clone)]
pub struct StaticRenderer {
    png: Vec<u8>,
    fail: bool,
}

impl StaticRenderer {
    /// Return `png` for every PDF-looking input.
    pub fn new(png: impl Into<Vec<u8>>) -> Self {
        Self {
            png: png.into(),
            fail: false,
        }
    }

    /// Fail every render.
    pub fn failing() -> Self {
        Self {
            png: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PreviewRenderer for StaticRenderer {
    async fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Render("renderer unavailable".to_string()));
        }
        if !looks_like_pdf(pdf) {
            return Err(Error::Render("no first page: not a PDF".to_string()));
        }
        Ok(self.png.clone())
    }
}
