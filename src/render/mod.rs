//! QR code and sheet rendering.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Encode QR** | `qrcode` (error correction H, 4-module quiet zone) |
//! | **Rasterize → PNG** | `image::imageops::resize` with `Lanczos3`, PNG encoder |
//! | **Compose page → PDF** | `lopdf` (greyscale image XObject, one page) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for page and unit math (unit testable)
//! - **Parameters**: Data structures describing the page and QR placement
//! - **Backend**: [`QrEncoder`] and [`PdfComposer`] traits + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{PdfComposer, QrEncoder, RenderBackend, RenderError};
pub use calculations::{mm_to_pixels, mm_to_points, page_dimensions, qr_fits};
pub use operations::{QrArtifacts, compose_qr_page, generate_qr_image, plan_page};
pub use params::{
    Orientation, PageDimensions, PageDraft, PageLayout, PageSize, PlacedImage, QrPlacement,
};
pub use rust_backend::RustBackend;
