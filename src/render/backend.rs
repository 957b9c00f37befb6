//! Rendering backend traits and shared types.
//!
//! Two capabilities are needed to produce a sheet:
//!
//! - [`QrEncoder`] turns a URL into a PNG of the requested physical size.
//! - [`PdfComposer`] writes a [`PageDraft`] to a PDF file.
//!
//! [`RenderBackend`] is implemented for anything providing both. The
//! production implementation is [`RustBackend`](super::rust_backend::RustBackend).

use super::params::PageDraft;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("QR encoding failed: {0}")]
    QrEncode(String),
    #[error("Image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encodes text into a scannable QR raster.
pub trait QrEncoder {
    /// Encode `content` as a square PNG `size_mm` millimeters wide when printed.
    fn encode(&self, content: &str, size_mm: f64) -> Result<Vec<u8>, RenderError>;
}

/// Writes a single page to a PDF file.
pub trait PdfComposer {
    fn save(&self, page: &PageDraft, output: &Path) -> Result<(), RenderError>;
}

/// Everything the batch pipeline needs to render a sheet.
pub trait RenderBackend: QrEncoder + PdfComposer {}

impl<T: QrEncoder + PdfComposer> RenderBackend for T {}
