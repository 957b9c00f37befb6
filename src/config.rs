//! Store credentials and sheet layout settings.
//!
//! Two independent configuration sources feed a run:
//!
//! - **Store config** (`oss_config.json`, JSON): credentials, endpoint, bucket
//!   and an optional base path for the object store. Read once at startup,
//!   written by `qr-sheets store set`. A missing file is not an error; it
//!   yields the all-empty (invalid) config, and runs fall back to placeholder
//!   URLs.
//! - **Layout config** (`qr-sheets.toml` in the scan root, TOML): page size,
//!   orientation and QR placement. Stock defaults are overridden by the file,
//!   which is in turn overridden by command-line flags.
//!
//! ## Store config file
//!
//! ```json
//! {
//!   "access_key_id": "LTAI...",
//!   "access_key_secret": "...",
//!   "endpoint": "oss-cn-beijing.aliyuncs.com",
//!   "bucket_name": "archive-scans",
//!   "base_path": "documents/xigou"
//! }
//! ```
//!
//! ## Layout config file
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [page]
//! size = "a4"               # a3 | a4 | a5 | custom
//! orientation = "portrait"  # portrait | landscape
//! custom_width_mm = 210.0   # used when size = "custom"
//! custom_height_mm = 297.0
//!
//! [qr]
//! size_mm = 50.0            # edge length of the QR square
//! x_mm = 10.0               # offset from the page's lower-left corner
//! y_mm = 10.0
//! ```
//!
//! Unknown layout keys are rejected to catch typos early.

use crate::render::{Orientation, PageLayout, PageSize, QrPlacement, page_dimensions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default location of the store config, relative to the working directory.
pub const STORE_CONFIG_FILE: &str = "oss_config.json";

/// Layout config file name looked up in the scan root.
pub const LAYOUT_CONFIG_FILE: &str = "qr-sheets.toml";

// =============================================================================
// Store config
// =============================================================================

/// Object store connection settings.
///
/// Passed explicitly to everything that needs it; nothing reads it from a
/// global. All keys default to empty so partial files load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Endpoint host, with or without scheme (`oss-cn-beijing.aliyuncs.com`).
    pub endpoint: String,
    pub bucket_name: String,
    /// Optional key prefix for every uploaded object (`documents/xigou`).
    pub base_path: String,
}

impl StoreConfig {
    /// Load from a JSON file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Credentials, endpoint and bucket are all present.
    pub fn is_valid(&self) -> bool {
        [
            &self.access_key_id,
            &self.access_key_secret,
            &self.endpoint,
            &self.bucket_name,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Endpoint with any `http://` / `https://` scheme and trailing slashes removed.
    pub fn bare_host(&self) -> &str {
        let host = self.endpoint.trim();
        let host = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
            .unwrap_or(host);
        host.trim_end_matches('/')
    }

    /// Signing region derived from the endpoint's first host label.
    ///
    /// `oss-cn-beijing.aliyuncs.com` → `oss-cn-beijing`.
    pub fn region(&self) -> String {
        self.bare_host()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Secret with everything but the last four characters hidden.
    pub fn masked_secret(&self) -> String {
        let chars: Vec<char> = self.access_key_secret.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

// =============================================================================
// Layout config
// =============================================================================

/// Page and QR placement settings, all lengths in millimeters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub page: PageConfig,
    pub qr: QrConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub size: PageSize,
    pub orientation: Orientation,
    /// Page width when `size = "custom"`, before orientation is applied.
    pub custom_width_mm: f64,
    /// Page height when `size = "custom"`, before orientation is applied.
    pub custom_height_mm: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            custom_width_mm: 210.0,
            custom_height_mm: 297.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    pub size_mm: f64,
    pub x_mm: f64,
    pub y_mm: f64,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            size_mm: 50.0,
            x_mm: 10.0,
            y_mm: 10.0,
        }
    }
}

impl LayoutConfig {
    /// Validate lengths are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.qr.size_mm.is_finite() && self.qr.size_mm > 0.0) {
            return Err(ConfigError::Validation(
                "qr.size_mm must be a positive number".into(),
            ));
        }
        if !(self.qr.x_mm.is_finite() && self.qr.x_mm >= 0.0)
            || !(self.qr.y_mm.is_finite() && self.qr.y_mm >= 0.0)
        {
            return Err(ConfigError::Validation(
                "qr.x_mm and qr.y_mm must be zero or positive".into(),
            ));
        }
        if self.page.size == PageSize::Custom {
            let dims = [self.page.custom_width_mm, self.page.custom_height_mm];
            if dims.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
                return Err(ConfigError::Validation(
                    "page.custom_width_mm and page.custom_height_mm must be positive for a custom page"
                        .into(),
                ));
            }
        }
        let page = self.page_layout().page;
        let longest = page.width_mm.max(page.height_mm);
        if self.qr.size_mm > longest {
            return Err(ConfigError::Validation(format!(
                "qr.size_mm ({}) is larger than the page ({} mm)",
                self.qr.size_mm, longest
            )));
        }
        Ok(())
    }

    /// Resolve into oriented page dimensions plus QR placement.
    pub fn page_layout(&self) -> PageLayout {
        let page = page_dimensions(
            self.page.size,
            self.page.orientation,
            (self.page.custom_width_mm, self.page.custom_height_mm),
        );
        PageLayout {
            size: self.page.size,
            orientation: self.page.orientation,
            page,
            qr: QrPlacement {
                size_mm: self.qr.size_mm,
                x_mm: self.qr.x_mm,
                y_mm: self.qr.y_mm,
            },
        }
    }
}

/// Returns the stock layout defaults as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(LayoutConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `qr-sheets.toml` from the scan root, merged over stock defaults.
///
/// Returns the validated defaults when the file doesn't exist.
pub fn load_layout_config(root: &Path) -> Result<LayoutConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let config_path = root.join(LAYOUT_CONFIG_FILE);
    let merged = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(base, overlay)
    } else {
        base
    };
    let config: LayoutConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `qr-sheets.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# qr-sheets layout configuration
# ==============================
# Place this file as `qr-sheets.toml` in the scan root. All settings are
# optional; values shown below are the defaults. Command-line flags override
# anything set here. Unknown keys will cause an error.
#
# All lengths are millimeters.

# ---------------------------------------------------------------------------
# Page
# ---------------------------------------------------------------------------
[page]
# One of: "a3", "a4", "a5", "custom".
size = "a4"

# "portrait" or "landscape". Landscape swaps width and height.
orientation = "portrait"

# Page size used when size = "custom" (before orientation is applied).
custom_width_mm = 210.0
custom_height_mm = 297.0

# ---------------------------------------------------------------------------
# QR code
# ---------------------------------------------------------------------------
[qr]
# Edge length of the square QR code. At most the longer page side.
size_mm = 50.0

# Position of the QR code's lower-left corner, measured from the page's
# lower-left corner.
x_mm = 10.0
y_mm = 10.0
"##
}
