//! Shared test utilities for the qr-sheets test suite.
//!
//! Provides a compact way to lay out scan trees on disk and lookup helpers for
//! run summaries.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let root = create_root(&tmp, "archive", &["village1/a.jpg", "village2/"]);
//!
//! let summary = run_batch(&root, ...).unwrap();
//! let report = find_report(&summary, "village1");
//! assert!(report.outcome.is_done());
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::pipeline::{DirectoryReport, RunSummary};
use crate::scan::TargetDirectory;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create files and directories below `base`.
///
/// Entries ending in `/` become directories; everything else becomes a small
/// placeholder file (the pipeline only looks at extensions, never decodes
/// source images). Parent directories are created as needed.
pub fn create_tree(base: &Path, entries: &[&str]) {
    for entry in entries {
        let path = base.join(entry.trim_end_matches('/'));
        if entry.ends_with('/') {
            std::fs::create_dir_all(&path).unwrap();
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, format!("fake image {entry}")).unwrap();
        }
    }
}

/// Create a named scan root inside `tmp` and populate it.
///
/// Temp directories get dotted names (`.tmpXXXX`), so tests use a named child
/// as the root to keep root names readable in generated URLs.
pub fn create_root(tmp: &TempDir, name: &str, entries: &[&str]) -> PathBuf {
    let root = tmp.path().join(name);
    std::fs::create_dir_all(&root).unwrap();
    create_tree(&root, entries);
    root
}

// =========================================================================
// Lookups — panics with a clear message on miss
// =========================================================================

/// Names of the discovered targets, in discovery order.
pub fn target_names(targets: &[TargetDirectory]) -> Vec<String> {
    targets.iter().map(|t| t.name()).collect()
}

/// Find the report for a directory by name. Panics if not found.
pub fn find_report<'a>(summary: &'a RunSummary, name: &str) -> &'a DirectoryReport {
    summary
        .directories
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = summary.directories.iter().map(|r| r.name.as_str()).collect();
            panic!("directory '{name}' not in summary. Available: {names:?}")
        })
}

/// Assert that some log line contains `needle`.
pub fn assert_logged(summary: &RunSummary, needle: &str) {
    assert!(
        summary.log.iter().any(|line| line.contains(needle)),
        "no log line contains '{needle}'. Log:\n{}",
        summary.log.join("\n")
    );
}
