//! High-level rendering operations.
//!
//! These functions combine layout calculations with backend execution: they
//! decide where artifacts go and what the page looks like, then call the
//! backend to produce bytes.

use super::backend::{PdfComposer, QrEncoder, RenderError};
use super::calculations::qr_fits;
use super::params::{PageDraft, PageLayout};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Artifact paths for a target directory: `{dirName}_qr.png`, `{dirName}_qr.pdf`.
///
/// Names depend only on the directory name, so re-running overwrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrArtifacts {
    pub png: PathBuf,
    pub pdf: PathBuf,
}

impl QrArtifacts {
    pub fn for_directory(directory: &Path, dir_name: &str) -> Self {
        Self {
            png: directory.join(format!("{dir_name}_qr.png")),
            pdf: directory.join(format!("{dir_name}_qr.pdf")),
        }
    }
}

/// Encode `content` and write the PNG to `output`. Returns the PNG bytes.
pub fn generate_qr_image(
    backend: &impl QrEncoder,
    content: &str,
    size_mm: f64,
    output: &Path,
) -> Result<Vec<u8>> {
    let png = backend.encode(content, size_mm)?;
    fs::write(output, &png)?;
    Ok(png)
}

/// Plan a sheet without rendering it.
pub fn plan_page(layout: &PageLayout, qr_png: Vec<u8>) -> PageDraft {
    let mut page = PageDraft::new(layout.page.width_mm, layout.page.height_mm);
    page.draw_image(
        qr_png,
        layout.qr.x_mm,
        layout.qr.y_mm,
        layout.qr.size_mm,
        layout.qr.size_mm,
    );
    page
}

/// Lay the QR image out on a page and write the PDF to `output`.
///
/// A QR square that extends past the page edge is a warning, not an error.
pub fn compose_qr_page(
    backend: &impl PdfComposer,
    layout: &PageLayout,
    qr_png: Vec<u8>,
    output: &Path,
) -> Result<()> {
    if !qr_fits(layout) {
        warn!(
            page_width_mm = layout.page.width_mm,
            page_height_mm = layout.page.height_mm,
            qr_size_mm = layout.qr.size_mm,
            x_mm = layout.qr.x_mm,
            y_mm = layout.qr.y_mm,
            "QR code extends past the page edge"
        );
    }
    backend.save(&plan_page(layout, qr_png), output)
}
