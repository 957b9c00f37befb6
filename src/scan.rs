//! Target directory discovery and image listing.
//!
//! First step of every run. A scan root holds either one level of folders
//! (village layout) or two levels (township layout) above the leaf folders
//! that contain the scanned pages:
//!
//! ```text
//! two-level                       three-level
//! archive/                        archive/
//! ├── village1/      ← target     ├── township1/
//! │   ├── 001.jpg                 │   ├── village1/    ← target
//! │   └── 002.png                 │   └── village2/    ← target
//! └── village2/      ← target     └── township2/
//!     └── 001.jpg                     └── village3/    ← target
//! ```
//!
//! ## Rules
//!
//! - Entries whose name starts with `.` are ignored at every level.
//! - Loose files next to the target directories are ignored.
//! - Listings are sorted by file name, so a run visits directories and
//!   uploads images in the same order every time.
//! - Files this tool writes into a target (`*_qr.png`, `*_qr.pdf`,
//!   `index.html`) are never picked up as source images on a re-run.
//!
//! A directory that cannot be read never stops the batch: [`discover`] returns
//! it as a skipped entry, and [`list_images`] reports it as empty.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Image extensions accepted as source pages (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Suffixes of the artifacts written next to the source images.
const GENERATED_SUFFIXES: &[&str] = &["_qr.png", "_qr.pdf"];

/// How deep below the scan root the target directories live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DirectoryDepth {
    /// `root/<target>`
    TwoLevel,
    /// `root/<group>/<target>`
    ThreeLevel,
}

impl DirectoryDepth {
    /// Number of directory levels between the root and a target.
    pub fn levels_below_root(self) -> usize {
        match self {
            DirectoryDepth::TwoLevel => 1,
            DirectoryDepth::ThreeLevel => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DirectoryDepth::TwoLevel => "two-level",
            DirectoryDepth::ThreeLevel => "three-level",
        }
    }
}

/// A leaf directory that receives a QR sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDirectory {
    pub path: PathBuf,
}

impl TargetDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Final path component, used for artifact names and page titles.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// A source image inside a target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// Result of walking a scan root: the targets plus entries that could not be
/// read on the way down (permission errors, symlink loops).
#[derive(Debug, Default)]
pub struct Discovery {
    pub targets: Vec<TargetDirectory>,
    pub skipped: Vec<SkippedEntry>,
}

/// A directory entry that discovery had to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub error: String,
}

/// Walk `root` and collect the target directories for the given depth.
///
/// Only an unreadable or missing root is an error. Entries that fail below
/// the root are returned in [`Discovery::skipped`] so callers can report them.
pub fn discover(root: &Path, depth: DirectoryDepth) -> Result<Discovery, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| ScanError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;

    let levels = depth.levels_below_root();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(levels)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (e.file_type().is_dir() && !is_hidden(e.file_name())));

    let mut discovery = Discovery::default();
    for entry in walker {
        match entry {
            Ok(entry) if entry.depth() == levels => {
                discovery.targets.push(TargetDirectory::new(entry.into_path()));
            }
            Ok(_) => {}
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %err, "skipping unreadable directory");
                discovery.skipped.push(SkippedEntry {
                    path,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(discovery)
}

/// Find every target directory under `root` for the given layout depth.
///
/// Like [`discover`], with skipped entries only logged.
pub fn discover_target_directories(
    root: &Path,
    depth: DirectoryDepth,
) -> Result<Vec<TargetDirectory>, ScanError> {
    discover(root, depth).map(|d| d.targets)
}

/// List the source images of a directory, sorted by file name.
pub fn try_list_images(directory: &Path) -> Result<Vec<ImageFile>, ScanError> {
    let entries = fs::read_dir(directory).map_err(|source| ScanError::ReadDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut images: Vec<ImageFile> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_source_image(p))
        .map(|path| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ImageFile { path, file_name }
        })
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}

/// Like [`try_list_images`], but an unreadable directory yields no images.
pub fn list_images(directory: &Path) -> Vec<ImageFile> {
    match try_list_images(directory) {
        Ok(images) => images,
        Err(err) => {
            warn!(error = %err, "treating unreadable directory as empty");
            Vec::new()
        }
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn is_source_image(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if GENERATED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
