//! Batch orchestration: discover → (upload) → resolve URL → QR → PDF.
//!
//! Each target directory moves through these stages:
//!
//! ```text
//! discovered → scanned ─┬─ no images ──────────────────────────→ skipped
//!                       └─ [uploading] → url resolved → qr → pdf → done
//!                                                        │     │
//!                                                        └─────┴──→ failed(stage)
//! ```
//!
//! - Uploads run only when auto-upload is on and a store is available. A
//!   failed file is logged and counted; the directory carries on with the
//!   rest.
//! - With at least one upload, the gallery page is built and uploaded and its
//!   URL is encoded. If that fails, the first uploaded image's URL minus the
//!   file name is used instead. Without uploads the URL is computed from the
//!   store config (see [`crate::url`]).
//! - A QR failure stops the directory before any PDF is attempted.
//! - No directory failure stops the batch. Only an unreadable scan root is an
//!   error, since there is nothing to iterate.
//!
//! Directories and files are processed one at a time, in sorted order.
//!
//! ## Progress
//!
//! Every step is published as a [`RunEvent`] to the observers registered on
//! the [`EventBus`]. Publishing never blocks, and observers cannot influence
//! the run. The same events, formatted by
//! [`output::format_run_event`](crate::output::format_run_event), make up
//! [`RunSummary::log`].

use crate::config::StoreConfig;
use crate::gallery::build_gallery_page;
use crate::output::format_run_event;
use crate::render::{PageLayout, QrArtifacts, RenderBackend, compose_qr_page, generate_qr_image};
use crate::scan::{
    DirectoryDepth, Discovery, ImageFile, ScanError, TargetDirectory, discover, try_list_images,
};
use crate::store::{ObjectKey, RemoteStore, StoreError, UploadedAsset, upload_file};
use crate::url::{CanonicalUrl, INDEX_PAGE, UrlSource, resolve_canonical_url, trim_last_segment};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Settings for a full sheet run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub depth: DirectoryDepth,
    pub auto_upload: bool,
    pub layout: PageLayout,
}

/// Stage at which a directory failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Qr,
    Pdf,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Upload => "upload",
            Stage::Qr => "QR",
            Stage::Pdf => "PDF",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DirectoryOutcome {
    Done,
    /// No qualifying images.
    Skipped,
    Failed { stage: Stage, reason: String },
}

impl DirectoryOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, DirectoryOutcome::Done)
    }
}

/// What happened to one target directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub path: PathBuf,
    pub name: String,
    pub image_count: usize,
    pub uploads_succeeded: usize,
    pub uploads_failed: usize,
    pub url: Option<String>,
    pub url_source: Option<UrlSource>,
    pub qr_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    pub outcome: DirectoryOutcome,
}

impl DirectoryReport {
    fn new(target: &TargetDirectory, image_count: usize) -> Self {
        Self {
            path: target.path.clone(),
            name: target.name(),
            image_count,
            uploads_succeeded: 0,
            uploads_failed: 0,
            url: None,
            url_source: None,
            qr_path: None,
            pdf_path: None,
            outcome: DirectoryOutcome::Skipped,
        }
    }
}

/// Counts and log of a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub directories: Vec<DirectoryReport>,
    /// Every progress line, in order.
    pub log: Vec<String>,
}

/// Progress events, in the order a run produces them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        root: PathBuf,
        depth: DirectoryDepth,
        /// `None` for upload-only runs.
        layout: Option<PageLayout>,
        auto_upload: bool,
    },
    /// Auto-upload was requested but cannot happen.
    UploadUnavailable {
        reason: String,
    },
    TargetsDiscovered {
        count: usize,
    },
    DirectoryStarted {
        index: usize,
        total: usize,
        name: String,
        path: PathBuf,
    },
    ScanFailed {
        path: PathBuf,
        error: String,
    },
    ImagesFound {
        count: usize,
    },
    DirectorySkipped {
        name: String,
    },
    UploadStarted {
        count: usize,
    },
    FileUploaded {
        file_name: String,
        url: String,
    },
    UploadFailed {
        file_name: String,
        error: String,
    },
    UploadFinished {
        succeeded: usize,
        failed: usize,
    },
    GalleryUploaded {
        url: String,
    },
    GalleryFailed {
        error: String,
    },
    UrlResolved {
        url: String,
        source: UrlSource,
    },
    QrGenerated {
        path: PathBuf,
    },
    PdfGenerated {
        path: PathBuf,
    },
    StageFailed {
        stage: Stage,
        error: String,
    },
    DirectoryFinished {
        name: String,
        outcome: DirectoryOutcome,
    },
    RunFinished {
        processed: usize,
        succeeded: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Fan-out of run events to any number of observers.
///
/// Channels are unbounded, so publishing never waits on an observer.
/// Observers whose receiver has been dropped are forgotten.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<RunEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<RunEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Register an existing sender.
    pub fn attach(&mut self, tx: Sender<RunEvent>) {
        self.subscribers.push(tx);
    }

    pub fn publish(&mut self, event: &RunEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Publishes events and keeps the formatted log.
struct Reporter {
    events: EventBus,
    log: Vec<String>,
}

impl Reporter {
    fn new(events: EventBus) -> Self {
        Self {
            events,
            log: Vec::new(),
        }
    }

    fn emit(&mut self, event: RunEvent) {
        self.log.extend(format_run_event(&event));
        self.events.publish(&event);
    }

    fn finish(mut self, directories: Vec<DirectoryReport>) -> RunSummary {
        let (mut succeeded, mut skipped, mut failed) = (0, 0, 0);
        for report in &directories {
            match report.outcome {
                DirectoryOutcome::Done => succeeded += 1,
                DirectoryOutcome::Skipped => skipped += 1,
                DirectoryOutcome::Failed { .. } => failed += 1,
            }
        }
        let processed = directories.len();

        info!(processed, succeeded, skipped, failed, "run finished");
        self.emit(RunEvent::RunFinished {
            processed,
            succeeded,
            skipped,
            failed,
        });

        RunSummary {
            processed,
            succeeded,
            skipped,
            failed,
            directories,
            log: self.log,
        }
    }
}

/// Everything a directory needs besides its own path.
struct RunContext<'a> {
    root: &'a Path,
    store_config: &'a StoreConfig,
    store: Option<&'a dyn RemoteStore>,
}

/// Images uploaded for one directory, plus the gallery page if it made it.
struct UploadOutcome {
    assets: Vec<UploadedAsset>,
    failed: usize,
    gallery_url: Option<String>,
}

/// Generate a QR sheet for every target directory under `root`.
///
/// `store` is used only when `options.auto_upload` is set and the store
/// config is valid; otherwise the run continues without uploading.
pub fn run_batch(
    root: &Path,
    options: &BatchOptions,
    store_config: &StoreConfig,
    store: Option<&dyn RemoteStore>,
    backend: &impl RenderBackend,
    events: EventBus,
) -> Result<RunSummary, PipelineError> {
    let mut reporter = Reporter::new(events);
    reporter.emit(RunEvent::RunStarted {
        root: root.to_path_buf(),
        depth: options.depth,
        layout: Some(options.layout),
        auto_upload: options.auto_upload,
    });

    let discovery = discover(root, options.depth)?;

    let store = if options.auto_upload {
        usable_store(store_config, store, &mut reporter)
    } else {
        None
    };
    let ctx = RunContext {
        root,
        store_config,
        store,
    };

    let directories = run_targets(discovery, &mut reporter, |target, reporter| {
        process_directory(&ctx, target, &options.layout, backend, reporter)
    });
    Ok(reporter.finish(directories))
}

/// Upload images and gallery pages without generating any sheets.
///
/// A directory succeeds when at least one image was uploaded.
pub fn run_upload_only(
    root: &Path,
    depth: DirectoryDepth,
    store_config: &StoreConfig,
    store: &dyn RemoteStore,
    events: EventBus,
) -> Result<RunSummary, PipelineError> {
    if !store_config.is_valid() {
        return Err(StoreError::NotConfigured.into());
    }

    let mut reporter = Reporter::new(events);
    reporter.emit(RunEvent::RunStarted {
        root: root.to_path_buf(),
        depth,
        layout: None,
        auto_upload: true,
    });

    let discovery = discover(root, depth)?;
    let ctx = RunContext {
        root,
        store_config,
        store: Some(store),
    };

    let directories = run_targets(discovery, &mut reporter, |target, reporter| {
        upload_only_directory(&ctx, store, target, reporter)
    });
    Ok(reporter.finish(directories))
}

/// Report skipped discovery entries, then run `each` on every target between
/// its start and finish events.
fn run_targets(
    discovery: Discovery,
    reporter: &mut Reporter,
    mut each: impl FnMut(&TargetDirectory, &mut Reporter) -> DirectoryReport,
) -> Vec<DirectoryReport> {
    for skipped in discovery.skipped {
        reporter.emit(RunEvent::ScanFailed {
            path: skipped.path,
            error: skipped.error,
        });
    }
    reporter.emit(RunEvent::TargetsDiscovered {
        count: discovery.targets.len(),
    });

    let total = discovery.targets.len();
    let mut directories = Vec::with_capacity(total);
    for (i, target) in discovery.targets.iter().enumerate() {
        reporter.emit(RunEvent::DirectoryStarted {
            index: i + 1,
            total,
            name: target.name(),
            path: target.path.clone(),
        });
        let report = each(target, reporter);
        reporter.emit(RunEvent::DirectoryFinished {
            name: report.name.clone(),
            outcome: report.outcome.clone(),
        });
        directories.push(report);
    }
    directories
}

fn upload_only_directory(
    ctx: &RunContext<'_>,
    store: &dyn RemoteStore,
    target: &TargetDirectory,
    reporter: &mut Reporter,
) -> DirectoryReport {
    let images = scan_images(target, reporter);
    let mut report = DirectoryReport::new(target, images.len());
    if images.is_empty() {
        reporter.emit(RunEvent::DirectorySkipped {
            name: report.name.clone(),
        });
        return report;
    }
    reporter.emit(RunEvent::ImagesFound {
        count: images.len(),
    });

    let uploaded = upload_directory(ctx, store, target, &images, reporter);
    report.uploads_succeeded = uploaded.assets.len();
    report.uploads_failed = uploaded.failed;
    if uploaded.assets.is_empty() {
        return fail(report, Stage::Upload, "no image could be uploaded", reporter);
    }
    let canonical = resolve_directory_url(ctx, target, Some(&uploaded));
    record_url(&mut report, canonical, reporter);
    report.outcome = DirectoryOutcome::Done;
    report
}

/// The store to upload with, or `None` (with a logged reason) if unusable.
fn usable_store<'a>(
    store_config: &StoreConfig,
    store: Option<&'a dyn RemoteStore>,
    reporter: &mut Reporter,
) -> Option<&'a dyn RemoteStore> {
    let reason = match store {
        _ if !store_config.is_valid() => "store config is incomplete",
        None => "no store client available",
        Some(store) => return Some(store),
    };
    warn!(reason, "auto-upload disabled for this run");
    reporter.emit(RunEvent::UploadUnavailable {
        reason: reason.to_string(),
    });
    None
}

fn scan_images(target: &TargetDirectory, reporter: &mut Reporter) -> Vec<ImageFile> {
    match try_list_images(&target.path) {
        Ok(images) => images,
        Err(err) => {
            warn!(error = %err, "treating unreadable directory as empty");
            reporter.emit(RunEvent::ScanFailed {
                path: target.path.clone(),
                error: err.to_string(),
            });
            Vec::new()
        }
    }
}

fn process_directory(
    ctx: &RunContext<'_>,
    target: &TargetDirectory,
    layout: &PageLayout,
    backend: &impl RenderBackend,
    reporter: &mut Reporter,
) -> DirectoryReport {
    let images = scan_images(target, reporter);
    let mut report = DirectoryReport::new(target, images.len());
    if images.is_empty() {
        reporter.emit(RunEvent::DirectorySkipped {
            name: report.name.clone(),
        });
        return report;
    }
    reporter.emit(RunEvent::ImagesFound {
        count: images.len(),
    });

    let uploaded = match ctx.store {
        Some(store) => Some(upload_directory(ctx, store, target, &images, reporter)),
        None => None,
    };
    if let Some(uploaded) = &uploaded {
        report.uploads_succeeded = uploaded.assets.len();
        report.uploads_failed = uploaded.failed;
    }

    let canonical = resolve_directory_url(ctx, target, uploaded.as_ref());
    let url = canonical.url.clone();
    record_url(&mut report, canonical, reporter);

    let artifacts = QrArtifacts::for_directory(&target.path, &report.name);
    let png = match generate_qr_image(backend, &url, layout.qr.size_mm, &artifacts.png) {
        Ok(png) => png,
        Err(err) => return fail(report, Stage::Qr, err, reporter),
    };
    debug!(path = %artifacts.png.display(), "QR image written");
    reporter.emit(RunEvent::QrGenerated {
        path: artifacts.png.clone(),
    });
    report.qr_path = Some(artifacts.png);

    if let Err(err) = compose_qr_page(backend, layout, png, &artifacts.pdf) {
        return fail(report, Stage::Pdf, err, reporter);
    }
    debug!(path = %artifacts.pdf.display(), "PDF written");
    reporter.emit(RunEvent::PdfGenerated {
        path: artifacts.pdf.clone(),
    });
    report.pdf_path = Some(artifacts.pdf);
    report.outcome = DirectoryOutcome::Done;
    report
}

fn upload_directory(
    ctx: &RunContext<'_>,
    store: &dyn RemoteStore,
    target: &TargetDirectory,
    images: &[ImageFile],
    reporter: &mut Reporter,
) -> UploadOutcome {
    reporter.emit(RunEvent::UploadStarted {
        count: images.len(),
    });

    let mut assets = Vec::new();
    let mut failed = 0;
    for image in images {
        let key = ObjectKey::for_file(ctx.store_config, ctx.root, &target.path, &image.file_name);
        match upload_file(store, &image.path, key) {
            Ok(asset) => {
                debug!(key = %asset.remote_key, "image uploaded");
                reporter.emit(RunEvent::FileUploaded {
                    file_name: image.file_name.clone(),
                    url: asset.public_url.clone(),
                });
                assets.push(asset);
            }
            Err(err) => {
                warn!(file = %image.path.display(), error = %err, "upload failed");
                failed += 1;
                reporter.emit(RunEvent::UploadFailed {
                    file_name: image.file_name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    reporter.emit(RunEvent::UploadFinished {
        succeeded: assets.len(),
        failed,
    });

    let gallery_url = if assets.is_empty() {
        None
    } else {
        publish_gallery(ctx, store, target, &assets, reporter)
    };

    UploadOutcome {
        assets,
        failed,
        gallery_url,
    }
}

/// Build `index.html` for the uploaded assets and upload it.
fn publish_gallery(
    ctx: &RunContext<'_>,
    store: &dyn RemoteStore,
    target: &TargetDirectory,
    assets: &[UploadedAsset],
    reporter: &mut Reporter,
) -> Option<String> {
    let result = build_gallery_page(&target.path, &target.name(), assets)
        .map_err(|e| e.to_string())
        .and_then(|page| {
            let key = ObjectKey::for_file(ctx.store_config, ctx.root, &target.path, INDEX_PAGE);
            upload_file(store, &page, key).map_err(|e| e.to_string())
        });

    match result {
        Ok(page) => {
            reporter.emit(RunEvent::GalleryUploaded {
                url: page.public_url.clone(),
            });
            Some(page.public_url)
        }
        Err(error) => {
            warn!(directory = %target.path.display(), %error, "gallery page not published");
            reporter.emit(RunEvent::GalleryFailed { error });
            None
        }
    }
}

/// Gallery URL, else first uploaded asset's directory, else computed.
fn resolve_directory_url(
    ctx: &RunContext<'_>,
    target: &TargetDirectory,
    uploaded: Option<&UploadOutcome>,
) -> CanonicalUrl {
    if let Some(uploaded) = uploaded {
        if let Some(url) = &uploaded.gallery_url {
            return resolve_canonical_url(ctx.store_config, ctx.root, &target.path, Some(url));
        }
        if let Some(first) = uploaded.assets.first() {
            return CanonicalUrl {
                url: trim_last_segment(&first.public_url),
                source: UrlSource::UploadedAsset,
            };
        }
    }
    resolve_canonical_url(ctx.store_config, ctx.root, &target.path, None)
}

fn record_url(report: &mut DirectoryReport, canonical: CanonicalUrl, reporter: &mut Reporter) {
    reporter.emit(RunEvent::UrlResolved {
        url: canonical.url.clone(),
        source: canonical.source,
    });
    report.url = Some(canonical.url);
    report.url_source = Some(canonical.source);
}

fn fail(
    mut report: DirectoryReport,
    stage: Stage,
    err: impl fmt::Display,
    reporter: &mut Reporter,
) -> DirectoryReport {
    let reason = err.to_string();
    warn!(directory = %report.path.display(), %stage, error = %reason, "directory failed");
    reporter.emit(RunEvent::StageFailed {
        stage,
        error: reason.clone(),
    });
    report.outcome = DirectoryOutcome::Failed { stage, reason };
    report
}
