//! CLI output formatting.
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and, where the CLI needs one, a `print_*` wrapper that writes
//! to stdout. Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Root: /data/archive
//! Layout: two-level
//! Page: A4 portrait (210 × 297 mm)
//! QR: 50 mm at (10, 10) mm
//! Auto-upload: on
//! Found 2 target directories
//! [1/2] village1
//!     2 images
//!     Uploading 2 images
//!     ✓ a.jpg
//!     ✗ b.png: Upload of archive/village1/b.png failed: ...
//!     Uploaded: 1 succeeded, 1 failed
//!     ✓ index.html
//!     URL (gallery): https://bucket.oss-cn-beijing.aliyuncs.com/archive/village1/index.html
//!     QR: village1_qr.png
//!     PDF: village1_qr.pdf
//!     Done
//! [2/2] village2
//!     Skipped: no images
//! Processed 2 directories: 1 succeeded, 1 skipped, 0 failed
//! ```
//!
//! ## Scan
//!
//! ```text
//! 001 village1 (2 images)
//!     Source: township/village1
//! 002 village2 (0 images)
//!     Source: township/village2
//! ```

use crate::config::StoreConfig;
use crate::pipeline::{DirectoryOutcome, RunEvent, RunSummary};
use crate::scan::{SkippedEntry, TargetDirectory};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

// ============================================================================
// Run events
// ============================================================================

/// Log lines for one run event. Some events produce no line.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    let i1 = indent(1);
    match event {
        RunEvent::RunStarted {
            root,
            depth,
            layout,
            auto_upload,
        } => {
            let mut lines = vec![
                format!("Root: {}", root.display()),
                format!("Layout: {}", depth.label()),
            ];
            if let Some(layout) = layout {
                lines.push(format!(
                    "Page: {} {} ({} × {} mm)",
                    layout.size.label(),
                    layout.orientation.label(),
                    layout.page.width_mm,
                    layout.page.height_mm
                ));
                lines.push(format!(
                    "QR: {} mm at ({}, {}) mm",
                    layout.qr.size_mm, layout.qr.x_mm, layout.qr.y_mm
                ));
            }
            lines.push(format!("Auto-upload: {}", on_off(*auto_upload)));
            lines
        }
        RunEvent::UploadUnavailable { reason } => {
            vec![format!(
                "Auto-upload unavailable ({reason}); continuing without upload"
            )]
        }
        RunEvent::TargetsDiscovered { count } => {
            vec![format!(
                "Found {}",
                plural(*count, "target directory", "target directories")
            )]
        }
        RunEvent::DirectoryStarted {
            index, total, name, ..
        } => vec![format!("[{index}/{total}] {name}")],
        RunEvent::ScanFailed { path, error } => {
            vec![format!("{i1}Cannot read {}: {error}", path.display())]
        }
        RunEvent::ImagesFound { count } => vec![format!("{i1}{}", plural(*count, "image", "images"))],
        RunEvent::DirectorySkipped { .. } => vec![format!("{i1}Skipped: no images")],
        RunEvent::UploadStarted { count } => {
            vec![format!("{i1}Uploading {}", plural(*count, "image", "images"))]
        }
        RunEvent::FileUploaded { file_name, .. } => vec![format!("{i1}✓ {file_name}")],
        RunEvent::UploadFailed { file_name, error } => {
            vec![format!("{i1}✗ {file_name}: {error}")]
        }
        RunEvent::UploadFinished { succeeded, failed } => {
            vec![format!(
                "{i1}Uploaded: {succeeded} succeeded, {failed} failed"
            )]
        }
        RunEvent::GalleryUploaded { .. } => vec![format!("{i1}✓ index.html")],
        RunEvent::GalleryFailed { error } => vec![format!("{i1}✗ index.html: {error}")],
        RunEvent::UrlResolved { url, source } => {
            vec![format!("{i1}URL ({}): {url}", source.label())]
        }
        RunEvent::QrGenerated { path } => vec![format!("{i1}QR: {}", file_name(path))],
        RunEvent::PdfGenerated { path } => vec![format!("{i1}PDF: {}", file_name(path))],
        RunEvent::StageFailed { stage, error } => {
            vec![format!("{i1}Failed at {stage}: {error}")]
        }
        RunEvent::DirectoryFinished { outcome, .. } => match outcome {
            DirectoryOutcome::Done => vec![format!("{i1}Done")],
            DirectoryOutcome::Skipped | DirectoryOutcome::Failed { .. } => Vec::new(),
        },
        RunEvent::RunFinished {
            processed,
            succeeded,
            skipped,
            failed,
        } => vec![format!(
            "Processed {}: {succeeded} succeeded, {skipped} skipped, {failed} failed",
            plural(*processed, "directory", "directories")
        )],
    }
}

/// Per-directory recap printed after a run.
///
/// ```text
/// Summary
/// 001 village1: done
///     URL: https://...
/// 002 village2: skipped
/// 003 village3: failed at PDF (disk full)
/// ```
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec!["Summary".to_string()];
    for (i, report) in summary.directories.iter().enumerate() {
        let status = match &report.outcome {
            DirectoryOutcome::Done => "done".to_string(),
            DirectoryOutcome::Skipped => "skipped".to_string(),
            DirectoryOutcome::Failed { stage, reason } => format!("failed at {stage} ({reason})"),
        };
        lines.push(format!("{} {}: {}", format_index(i + 1), report.name, status));
        if let Some(url) = &report.url {
            lines.push(format!("{}URL: {url}", indent(1)));
        }
    }
    lines
}

pub fn print_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Discovered targets with their image counts, paths relative to `root`.
pub fn format_targets(root: &Path, targets: &[(TargetDirectory, usize)]) -> Vec<String> {
    if targets.is_empty() {
        return vec![format!("No target directories under {}", root.display())];
    }
    let mut lines = Vec::new();
    for (i, (target, count)) in targets.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            target.name(),
            plural(*count, "image", "images")
        ));
        let rel = target.path.strip_prefix(root).unwrap_or(&target.path);
        lines.push(format!("{}Source: {}", indent(1), rel.display()));
    }
    lines
}

pub fn print_targets(root: &Path, targets: &[(TargetDirectory, usize)]) {
    for line in format_targets(root, targets) {
        println!("{}", line);
    }
}

/// Entries discovery could not read.
pub fn format_skipped(skipped: &[SkippedEntry]) -> Vec<String> {
    skipped
        .iter()
        .map(|s| format!("Cannot read {}: {}", s.path.display(), s.error))
        .collect()
}

pub fn print_skipped(skipped: &[SkippedEntry]) {
    for line in format_skipped(skipped) {
        println!("{}", line);
    }
}

// ============================================================================
// Store config
// ============================================================================

/// Store settings with the secret masked.
pub fn format_store_config(config: &StoreConfig, path: &Path) -> Vec<String> {
    let show = |v: &str| {
        if v.is_empty() {
            "(not set)".to_string()
        } else {
            v.to_string()
        }
    };
    vec![
        format!("Store config: {}", path.display()),
        format!("{}Access key id: {}", indent(1), show(&config.access_key_id)),
        format!(
            "{}Access key secret: {}",
            indent(1),
            show(&config.masked_secret())
        ),
        format!("{}Endpoint: {}", indent(1), show(&config.endpoint)),
        format!("{}Bucket: {}", indent(1), show(&config.bucket_name)),
        format!("{}Base path: {}", indent(1), show(&config.base_path)),
        format!(
            "{}Status: {}",
            indent(1),
            if config.is_valid() {
                "configured"
            } else {
                "incomplete"
            }
        ),
    ]
}

pub fn print_store_config(config: &StoreConfig, path: &Path) {
    for line in format_store_config(config, path) {
        println!("{}", line);
    }
}
