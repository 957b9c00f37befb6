//! Parameter types for sheet rendering.
//!
//! These structs describe *what* to draw, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module and the
//! [`backend`](super::backend) that produces bytes, so tests can swap in a
//! recording mock without touching layout logic.
//!
//! All lengths are millimeters; conversion to points or pixels happens in the
//! backend via [`calculations`](super::calculations).

use serde::{Deserialize, Serialize};

/// Named page sizes plus a free-form custom size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A3,
    A4,
    A5,
    Custom,
}

impl PageSize {
    /// Portrait width × height in millimeters, `None` for [`PageSize::Custom`].
    pub fn portrait_mm(self) -> Option<(f64, f64)> {
        match self {
            PageSize::A3 => Some((297.0, 420.0)),
            PageSize::A4 => Some((210.0, 297.0)),
            PageSize::A5 => Some((148.0, 210.0)),
            PageSize::Custom => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::A5 => "A5",
            PageSize::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

/// Final page size after orientation has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageDimensions {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Square QR placement, offset from the page's lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QrPlacement {
    pub size_mm: f64,
    pub x_mm: f64,
    pub y_mm: f64,
}

/// Everything needed to lay out one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageLayout {
    pub size: PageSize,
    pub orientation: Orientation,
    pub page: PageDimensions,
    pub qr: QrPlacement,
}

/// A raster image placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// Encoded image bytes (PNG).
    pub bytes: Vec<u8>,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// One page under construction: its size and the images drawn on it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub width_mm: f64,
    pub height_mm: f64,
    pub images: Vec<PlacedImage>,
}

impl PageDraft {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            images: Vec::new(),
        }
    }

    /// Draw `bytes` with its lower-left corner at (`x_mm`, `y_mm`).
    pub fn draw_image(
        &mut self,
        bytes: Vec<u8>,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) {
        self.images.push(PlacedImage {
            bytes,
            x_mm,
            y_mm,
            width_mm,
            height_mm,
        });
    }
}
