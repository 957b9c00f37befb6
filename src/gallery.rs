//! Gallery page for an uploaded directory.
//!
//! The QR code on a sheet points at this page. It lists every uploaded image
//! in upload order as a thumbnail grid; clicking a thumbnail opens the full
//! image in a lightbox that closes on click or Escape.
//!
//! The page is self-contained (inline CSS and JS) and references images only
//! by their public URLs, so it works from the store without any other files.
//! It is written as `index.html` next to the source images and uploaded by
//! the pipeline.
//!
//! Directory and file names go through maud's escaping; URLs are inserted as
//! attribute values, also escaped.

use crate::store::UploadedAsset;
use crate::url::INDEX_PAGE;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Cannot write gallery page {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const CSS: &str = include_str!("../static/gallery.css");
const JS: &str = include_str!("../static/gallery.js");

/// Render the gallery markup for `dir_name`.
pub fn render_gallery(dir_name: &str, assets: &[UploadedAsset]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="zh-CN" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (dir_name) " - 图片浏览" }
                style { (PreEscaped(CSS)) }
            }
            body {
                main.gallery-page {
                    h1 { (dir_name) }
                    p.image-count { "共 " (assets.len()) " 张图片" }
                    div.image-grid {
                        @for asset in assets {
                            (render_item(asset))
                        }
                    }
                }
                div.lightbox id="lightbox" {
                    span.lightbox-close { "×" }
                    img id="lightbox-img" alt="";
                }
                script { (PreEscaped(JS)) }
            }
        }
    }
}

fn render_item(asset: &UploadedAsset) -> Markup {
    let name = asset.display_name();
    html! {
        figure.image-item data-full=(asset.public_url) data-name=(name) {
            img src=(asset.public_url) alt=(name) loading="lazy";
            figcaption { (name) }
        }
    }
}

/// Write `index.html` into `directory`. Returns its path.
pub fn build_gallery_page(
    directory: &Path,
    dir_name: &str,
    assets: &[UploadedAsset],
) -> Result<PathBuf, GalleryError> {
    let path = directory.join(INDEX_PAGE);
    fs::write(&path, render_gallery(dir_name, assets).into_string()).map_err(|source| {
        GalleryError::Io {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}
