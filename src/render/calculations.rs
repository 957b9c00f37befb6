//! Pure calculation functions for page geometry and unit conversion.
//!
//! All functions here are pure and testable without any I/O.

use super::params::{Orientation, PageDimensions, PageLayout, PageSize};

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// Resolve the oriented page size.
///
/// `custom` is the (width, height) used for [`PageSize::Custom`]. Landscape
/// swaps width and height for every size, custom included.
pub fn page_dimensions(
    size: PageSize,
    orientation: Orientation,
    custom: (f64, f64),
) -> PageDimensions {
    let (w, h) = size.portrait_mm().unwrap_or(custom);
    let (width_mm, height_mm) = match orientation {
        Orientation::Portrait => (w, h),
        Orientation::Landscape => (h, w),
    };
    PageDimensions {
        width_mm,
        height_mm,
    }
}

/// Millimeters to PDF points (1/72 inch).
pub fn mm_to_points(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

/// Millimeters to whole pixels at `dpi`, rounded.
pub fn mm_to_pixels(mm: f64, dpi: u32) -> u32 {
    (mm * dpi as f64 / MM_PER_INCH).round().max(0.0) as u32
}

/// Whether the QR square lies entirely within the page.
pub fn qr_fits(layout: &PageLayout) -> bool {
    let qr = &layout.qr;
    qr.x_mm >= 0.0
        && qr.y_mm >= 0.0
        && qr.x_mm + qr.size_mm <= layout.page.width_mm
        && qr.y_mm + qr.size_mm <= layout.page.height_mm
}
