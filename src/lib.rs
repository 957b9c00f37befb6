//! # qr-sheets
//!
//! Print-ready QR sheets for folders of scanned documents. Each leaf folder of
//! an archive gets a PDF page carrying a QR code that links to the folder's
//! images online, so a paper file box can point at its digital copy.
//!
//! # Pipeline
//!
//! ```text
//! 1. Discover  root/      →  target directories   (two- or three-level layout)
//! 2. Upload    images     →  object store          (optional, plus gallery page)
//! 3. Resolve   config     →  canonical URL         (gallery, asset, computed or placeholder)
//! 4. Render    URL        →  {dir}_qr.png, {dir}_qr.pdf
//! ```
//!
//! Directories are handled one at a time. A failure in one directory is
//! recorded and the batch moves on; only an unreadable root stops a run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds target directories and lists their source images |
//! | [`url`] | Builds public URLs from raw path segments, encoding each once |
//! | [`store`] | `RemoteStore` trait, object keys, S3-compatible client |
//! | [`gallery`] | Renders the `index.html` image browser with Maud |
//! | [`render`] | QR encoding and PDF page composition behind swappable traits |
//! | [`pipeline`] | Runs the batch, publishes progress events, builds the summary |
//! | [`config`] | Store credentials (JSON) and page layout (TOML over stock defaults) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Store Config
//!
//! Credentials live in `oss_config.json` and travel as a [`config::StoreConfig`]
//! value into every function that needs them. Nothing reads a global.
//!
//! ## Encode Once
//!
//! Directory names in this domain are usually Chinese. URLs are assembled from
//! raw segments by [`url::PublicUrl`], which percent-encodes each segment a
//! single time. URLs returned by the store are already final and are never
//! re-encoded.
//!
//! ## Observers, Not Callbacks
//!
//! The batch reports progress as [`pipeline::RunEvent`] values sent over
//! channels. The CLI prints them from its own thread; tests collect them.
//! Observers cannot stall or alter a run.

pub mod config;
pub mod gallery;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod store;
pub mod url;

#[cfg(test)]
pub(crate) mod test_helpers;
