use clap::{Parser, Subcommand};
use qr_sheets::config::{self, LayoutConfig, StoreConfig};
use qr_sheets::output;
use qr_sheets::pipeline::{self, BatchOptions, EventBus};
use qr_sheets::render::{Orientation, PageSize, RustBackend};
use qr_sheets::scan::{self, DirectoryDepth};
use qr_sheets::store::{RemoteStore, S3Store};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn version_string() -> &'static str {
    let on_tag = env!("QR_SHEETS_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("QR_SHEETS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "qr-sheets")]
#[command(about = "QR code sheets for folders of scanned documents")]
#[command(long_about = "\
QR code sheets for folders of scanned documents

Every leaf folder of an archive gets a PDF page with a QR code linking to the
folder's images. Images can be uploaded to an S3-compatible store (Aliyun OSS,
MinIO, AWS) together with a browsable index.html.

Folder layouts:

  two-level                       three-level
  archive/                        archive/
  ├── village1/      ← sheet      ├── township1/
  │   ├── 001.jpg                 │   ├── village1/    ← sheet
  │   └── 002.png                 │   └── village2/    ← sheet
  └── village2/      ← sheet      └── township2/
                                      └── village3/    ← sheet

Output per folder (overwritten on every run):

  village1/
  ├── village1_qr.png
  ├── village1_qr.pdf
  └── index.html                  # only when uploading

Page layout is read from qr-sheets.toml in the archive root, then overridden
by flags. Run 'qr-sheets gen-config' for a documented template.

Store credentials live in oss_config.json; see 'qr-sheets store set --help'.
Set QR_SHEETS_LOG=debug for diagnostic logging on stderr.")]
#[command(version = version_string())]
struct Cli {
    /// Store config file
    #[arg(long, default_value = config::STORE_CONFIG_FILE, global = true)]
    store_config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Archive root and folder layout.
#[derive(clap::Args, Clone)]
struct ScanArgs {
    /// Archive root directory
    root: PathBuf,

    /// Where the sheet folders sit below the root
    #[arg(long, value_enum, default_value = "two-level")]
    depth: DirectoryDepth,
}

/// Overrides for qr-sheets.toml.
#[derive(clap::Args, Clone, Default)]
struct LayoutArgs {
    /// Page size
    #[arg(long, value_enum)]
    page_size: Option<PageSize>,

    /// Page orientation (landscape swaps width and height)
    #[arg(long, value_enum)]
    orientation: Option<Orientation>,

    /// Custom page width in mm (with --page-size custom)
    #[arg(long)]
    page_width: Option<f64>,

    /// Custom page height in mm (with --page-size custom)
    #[arg(long)]
    page_height: Option<f64>,

    /// QR code edge length in mm
    #[arg(long)]
    qr_size: Option<f64>,

    /// QR offset from the page's left edge in mm
    #[arg(long)]
    qr_x: Option<f64>,

    /// QR offset from the page's bottom edge in mm
    #[arg(long)]
    qr_y: Option<f64>,
}

impl LayoutArgs {
    fn apply(&self, config: &mut LayoutConfig) {
        if let Some(size) = self.page_size {
            config.page.size = size;
        }
        if let Some(orientation) = self.orientation {
            config.page.orientation = orientation;
        }
        if let Some(w) = self.page_width {
            config.page.custom_width_mm = w;
        }
        if let Some(h) = self.page_height {
            config.page.custom_height_mm = h;
        }
        if let Some(size) = self.qr_size {
            config.qr.size_mm = size;
        }
        if let Some(x) = self.qr_x {
            config.qr.x_mm = x;
        }
        if let Some(y) = self.qr_y {
            config.qr.y_mm = y;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate QR sheets, optionally uploading images first
    Run {
        #[command(flatten)]
        target: ScanArgs,

        /// Upload images and a gallery page before generating sheets
        #[arg(long)]
        upload: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Upload images and gallery pages without generating sheets
    Upload(ScanArgs),
    /// List sheet folders and their image counts
    Scan(ScanArgs),
    /// Show, edit or test the store config
    Store {
        #[command(subcommand)]
        command: StoreCommand,
    },
    /// Print a stock qr-sheets.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// Print the store config (secret masked)
    Show,
    /// Update store config fields and save
    Set {
        #[arg(long)]
        access_key_id: Option<String>,
        #[arg(long)]
        access_key_secret: Option<String>,
        /// Endpoint host, e.g. oss-cn-beijing.aliyuncs.com
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        bucket: Option<String>,
        /// Key prefix for all uploads, e.g. documents/2024
        #[arg(long)]
        base_path: Option<String>,
    },
    /// List one object to check credentials and bucket access
    Test,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Run {
            target,
            upload,
            layout,
        } => {
            let root = resolve_root(&target.root)?;
            let mut layout_config = config::load_layout_config(&root)?;
            layout.apply(&mut layout_config);
            layout_config.validate()?;

            let store_config = StoreConfig::load(&cli.store_config)?;
            let store = if upload && store_config.is_valid() {
                match S3Store::connect(&store_config) {
                    Ok(store) => Some(store),
                    Err(err) => {
                        tracing::warn!(error = %err, "object store unavailable");
                        None
                    }
                }
            } else {
                None
            };

            let options = BatchOptions {
                depth: target.depth,
                auto_upload: upload,
                layout: layout_config.page_layout(),
            };
            let (events, printer) = spawn_printer();
            let summary = pipeline::run_batch(
                &root,
                &options,
                &store_config,
                store.as_ref().map(|s| s as &dyn RemoteStore),
                &RustBackend::new(),
                events,
            )?;
            join_printer(printer)?;
            output::print_summary(&summary);
        }
        Command::Upload(target) => {
            let root = resolve_root(&target.root)?;
            let store_config = StoreConfig::load(&cli.store_config)?;
            let store = S3Store::connect(&store_config)?;

            let (events, printer) = spawn_printer();
            let summary =
                pipeline::run_upload_only(&root, target.depth, &store_config, &store, events)?;
            join_printer(printer)?;
            output::print_summary(&summary);
        }
        Command::Scan(target) => {
            let root = resolve_root(&target.root)?;
            let discovery = scan::discover(&root, target.depth)?;
            let targets: Vec<_> = discovery
                .targets
                .into_iter()
                .map(|t| {
                    let count = scan::list_images(&t.path).len();
                    (t, count)
                })
                .collect();
            output::print_targets(&root, &targets);
            output::print_skipped(&discovery.skipped);
        }
        Command::Store { command } => run_store_command(command, &cli.store_config)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_store_command(
    command: StoreCommand,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store_config = StoreConfig::load(path)?;
    match command {
        StoreCommand::Show => output::print_store_config(&store_config, path),
        StoreCommand::Set {
            access_key_id,
            access_key_secret,
            endpoint,
            bucket,
            base_path,
        } => {
            let fields = [
                (access_key_id, &mut store_config.access_key_id),
                (access_key_secret, &mut store_config.access_key_secret),
                (endpoint, &mut store_config.endpoint),
                (bucket, &mut store_config.bucket_name),
                (base_path, &mut store_config.base_path),
            ];
            for (value, field) in fields {
                if let Some(value) = value {
                    *field = value.trim().to_string();
                }
            }
            store_config.save(path)?;
            output::print_store_config(&store_config, path);
        }
        StoreCommand::Test => {
            let store = S3Store::connect(&store_config)?;
            store.test_connection()?;
            println!(
                "Connected to bucket {} at {}",
                store_config.bucket_name,
                store_config.bare_host()
            );
        }
    }
    Ok(())
}

/// Diagnostics go to stderr so they never interleave with progress on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("QR_SHEETS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

/// Absolute root, so the root's own name is known even for `.`.
fn resolve_root(root: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::canonicalize(root)
        .map_err(|e| format!("Cannot open archive root {}: {e}", root.display()).into())
}

/// Print run events from a separate thread as they arrive.
fn spawn_printer() -> (EventBus, JoinHandle<()>) {
    let mut events = EventBus::new();
    let rx = events.subscribe();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_run_event(&event) {
                println!("{}", line);
            }
        }
    });
    (events, printer)
}

fn join_printer(printer: JoinHandle<()>) -> Result<(), Box<dyn std::error::Error>> {
    printer
        .join()
        .map_err(|_| "progress printer thread panicked".into())
}
