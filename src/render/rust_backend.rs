//! Pure Rust rendering backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | QR matrix | `qrcode::QrCode::with_error_correction_level` (level H) |
//! | Rasterize | module grid painted into an `image::GrayImage` |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → PNG | `image::DynamicImage::write_to` |
//! | PDF page | `lopdf` document with one DeviceGray image XObject |

use super::backend::{PdfComposer, QrEncoder, RenderError};
use super::calculations::{mm_to_pixels, mm_to_points};
use super::params::PageDraft;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use qrcode::{Color, EcLevel, QrCode};
use std::io::Cursor;
use std::path::Path;

/// Print resolution of the QR raster.
pub const QR_DPI: u32 = 300;
/// Pixels per QR module before the final resize.
const MODULE_PX: usize = 10;
/// Light modules around the symbol.
const QUIET_ZONE: usize = 4;

/// Pure Rust backend: `qrcode` + `image` for the QR, `lopdf` for the page.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Paint the module grid black-on-white with a quiet zone.
fn rasterize(code: &QrCode) -> GrayImage {
    let modules = code.width();
    let side = ((modules + 2 * QUIET_ZONE) * MODULE_PX) as u32;
    let mut img = GrayImage::from_pixel(side, side, Luma([255]));

    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let left = (i % modules + QUIET_ZONE) * MODULE_PX;
        let top = (i / modules + QUIET_ZONE) * MODULE_PX;
        for y in top..top + MODULE_PX {
            for x in left..left + MODULE_PX {
                img.put_pixel(x as u32, y as u32, Luma([0]));
            }
        }
    }
    img
}

impl QrEncoder for RustBackend {
    fn encode(&self, content: &str, size_mm: f64) -> Result<Vec<u8>, RenderError> {
        let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::H)
            .map_err(|e| RenderError::QrEncode(e.to_string()))?;

        let target = mm_to_pixels(size_mm, QR_DPI).max(1);
        let resized = image::imageops::resize(&rasterize(&code), target, target, FilterType::Lanczos3);

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(resized).write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

fn real(mm: f64) -> Object {
    Object::Real(mm_to_points(mm) as f32)
}

impl PdfComposer for RustBackend {
    fn save(&self, page: &PageDraft, output: &Path) -> Result<(), RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut xobjects = Dictionary::new();
        let mut operations = Vec::new();
        for (i, placed) in page.images.iter().enumerate() {
            let gray = image::load_from_memory(&placed.bytes)?.to_luma8();
            let (width, height) = gray.dimensions();
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                gray.into_raw(),
            ));

            let name = format!("Im{}", i + 1);
            xobjects.set(name.clone(), image_id);
            // Unit square scaled to the image size, origin at its lower-left corner.
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    real(placed.width_mm),
                    Object::Integer(0),
                    Object::Integer(0),
                    real(placed.height_mm),
                    real(placed.x_mm),
                    real(placed.y_mm),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations }.encode().map_err(pdf_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let resources_id = doc.add_object(dictionary! { "XObject" => xobjects });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(page.width_mm), real(page.height_mm)],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        doc.save(output).map_err(pdf_error)?;
        Ok(())
    }
}
