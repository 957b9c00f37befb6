//! Public URL derivation for target directories.
//!
//! Every QR code encodes one URL. In order of preference:
//!
//! 1. **Gallery** — the URL the store returned for the uploaded `index.html`.
//! 2. **Uploaded asset** — the first uploaded image's URL with its file name
//!    trimmed (used by the pipeline when the gallery could not be built or
//!    uploaded).
//! 3. **Fallback** — computed from the store config without touching the
//!    network: `https://{bucket}.{host}/{basePath}/{rootName}/{relPath}/index.html`.
//! 4. **Placeholder** — a clearly fake host for runs without a valid store
//!    config, so sheets can still be printed and tested locally.
//!
//! ## Encoding
//!
//! URLs are built from raw path segments through [`PublicUrl`], which
//! percent-encodes each segment exactly once and never touches the scheme or
//! host. URLs handed back by the store are already encoded and are passed
//! through as strings without being re-parsed. CJK directory names and spaces
//! round-trip: decoding the path yields the original segments.

use crate::config::StoreConfig;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("Store config cannot produce a URL: {0}")]
    InvalidConfig(String),
}

/// Characters left unescaped inside a path segment (RFC 3986 unreserved).
/// Everything else, `/` included, is percent-encoded.
pub const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Gallery page name, both on disk and in the store.
pub const INDEX_PAGE: &str = "index.html";

/// Host used when no valid store config is available.
pub const PLACEHOLDER_HOST: &str = "your-bucket.oss-region.aliyuncs.com";

pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// Percent-decode an encoded path (lossy on invalid UTF-8).
pub fn decode_path(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// An `https` URL whose path was encoded from raw segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUrl {
    host: String,
    encoded_path: String,
}

impl PublicUrl {
    /// Build from a bare host and raw (unencoded) path segments.
    pub fn from_segments<I, S>(host: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let encoded_path = segments
            .into_iter()
            .map(|s| encode_segment(s.as_ref()))
            .collect::<Vec<_>>()
            .join("/");
        Self {
            host: host.into(),
            encoded_path,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn encoded_path(&self) -> &str {
        &self.encoded_path
    }

    pub fn decoded_path(&self) -> String {
        decode_path(&self.encoded_path)
    }
}

impl fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/{}", self.host, self.encoded_path)
    }
}

/// Raw path segments locating `target` under `root`.
///
/// - `target == root` → `[rootName]`
/// - `target` below `root` → `[rootName, rel1, rel2, ...]`
/// - otherwise → `[targetName]`
///
/// Empty names (a root of `/`) are dropped.
pub fn directory_segments(root: &Path, target: &Path) -> Vec<String> {
    let name_of = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let segments = match target.strip_prefix(root) {
        Ok(rel) => std::iter::once(name_of(root))
            .chain(rel.components().filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            }))
            .collect(),
        Err(_) => vec![name_of(target)],
    };
    // A filesystem root has no name of its own.
    segments.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Base path split into segments, empty parts dropped (`/a//b/` → `[a, b]`).
pub fn base_path_segments(base_path: &str) -> Vec<String> {
    base_path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Virtual-hosted host for the configured bucket: `{bucket}.{bareHost}`.
pub fn bucket_host(config: &StoreConfig) -> String {
    format!("{}.{}", config.bucket_name.trim(), config.bare_host())
}

/// Deterministic URL of the directory's gallery page, derived from config alone.
pub fn fallback_url(
    config: &StoreConfig,
    root: &Path,
    target: &Path,
) -> Result<PublicUrl, UrlError> {
    if !config.is_valid() {
        return Err(UrlError::InvalidConfig(
            "access key, secret, endpoint and bucket are required".into(),
        ));
    }
    let host = config.bare_host();
    if host.is_empty() || host.contains(['/', ' ']) {
        return Err(UrlError::InvalidConfig(format!(
            "endpoint '{}' is not a bare host",
            config.endpoint
        )));
    }

    let segments = base_path_segments(&config.base_path)
        .into_iter()
        .chain(directory_segments(root, target))
        .chain(std::iter::once(INDEX_PAGE.to_string()));
    Ok(PublicUrl::from_segments(bucket_host(config), segments))
}

/// Clearly fake URL for a directory, used without a valid store config.
pub fn placeholder_url(dir_name: &str) -> PublicUrl {
    PublicUrl::from_segments(PLACEHOLDER_HOST, [dir_name, INDEX_PAGE])
}

/// Drop the final path segment of an already-encoded URL.
///
/// `https://b.host/root/v/a.jpg` → `https://b.host/root/v`. The URL is treated
/// as opaque text: nothing is decoded or re-encoded.
pub fn trim_last_segment(url: &str) -> String {
    let path_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[path_start..].rfind('/') {
        Some(i) => url[..path_start + i].to_string(),
        None => url.to_string(),
    }
}

/// Where a canonical URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlSource {
    Gallery,
    UploadedAsset,
    Fallback,
    Placeholder,
}

impl UrlSource {
    pub fn label(self) -> &'static str {
        match self {
            UrlSource::Gallery => "gallery",
            UrlSource::UploadedAsset => "uploaded asset",
            UrlSource::Fallback => "computed",
            UrlSource::Placeholder => "placeholder",
        }
    }
}

/// The URL a directory's QR code encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalUrl {
    pub url: String,
    pub source: UrlSource,
}

/// Resolve the URL to encode for `target`.
///
/// A gallery URL returned by the store wins and is used verbatim. Otherwise
/// the deterministic fallback is computed; an unusable store config yields a
/// placeholder and a warning.
pub fn resolve_canonical_url(
    config: &StoreConfig,
    root: &Path,
    target: &Path,
    gallery_url: Option<&str>,
) -> CanonicalUrl {
    if let Some(url) = gallery_url {
        return CanonicalUrl {
            url: url.to_string(),
            source: UrlSource::Gallery,
        };
    }

    match fallback_url(config, root, target) {
        Ok(url) => CanonicalUrl {
            url: url.to_string(),
            source: UrlSource::Fallback,
        },
        Err(err) => {
            let dir_name = directory_segments(root, target)
                .pop()
                .unwrap_or_default();
            let url = placeholder_url(&dir_name);
            warn!(directory = %target.display(), error = %err, url = %url, "using placeholder URL");
            CanonicalUrl {
                url: url.to_string(),
                source: UrlSource::Placeholder,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_path: &str) -> StoreConfig {
        StoreConfig {
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            endpoint: "https://oss-cn-beijing.aliyuncs.com".into(),
            bucket_name: "scans".into(),
            base_path: base_path.into(),
        }
    }

    // =========================================================================
    // Segment encoding
    // =========================================================================

    #[test]
    fn segment_encoding_escapes_slash_space_and_cjk() {
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("村"), "%E6%9D%91");
        assert_eq!(encode_segment("v-1_2.~"), "v-1_2.~");
    }

    #[test]
    fn public_url_keeps_scheme_and_host_unencoded() {
        let url = PublicUrl::from_segments("b.oss-cn-beijing.aliyuncs.com", ["档案 2024", "index.html"]);
        assert_eq!(
            url.to_string(),
            "https://b.oss-cn-beijing.aliyuncs.com/%E6%A1%A3%E6%A1%88%202024/index.html"
        );
        assert_eq!(url.host(), "b.oss-cn-beijing.aliyuncs.com");
    }

    #[test]
    fn encoded_path_round_trips() {
        let url = PublicUrl::from_segments("h", ["西沟乡", "麻地 沟村", "index.html"]);
        assert_eq!(url.decoded_path(), "西沟乡/麻地 沟村/index.html");
    }

    #[test]
    fn percent_sign_in_name_is_encoded_once() {
        let url = PublicUrl::from_segments("h", ["100%"]);
        assert_eq!(url.encoded_path(), "100%25");
        assert_eq!(url.decoded_path(), "100%");
    }

    // =========================================================================
    // Directory segments
    // =========================================================================

    #[test]
    fn segments_for_root_itself() {
        assert_eq!(
            directory_segments(Path::new("/data/archive"), Path::new("/data/archive")),
            vec!["archive"]
        );
    }

    #[test]
    fn segments_for_nested_target() {
        assert_eq!(
            directory_segments(
                Path::new("/data/archive"),
                Path::new("/data/archive/township/village")
            ),
            vec!["archive", "township", "village"]
        );
    }

    #[test]
    fn segments_for_target_outside_root() {
        assert_eq!(
            directory_segments(Path::new("/data/archive"), Path::new("/elsewhere/village")),
            vec!["village"]
        );
    }

    #[test]
    fn filesystem_root_contributes_no_segment() {
        assert_eq!(
            directory_segments(Path::new("/"), Path::new("/village")),
            vec!["village"]
        );
        let url = fallback_url(&config(""), Path::new("/"), Path::new("/village")).unwrap();
        assert_eq!(
            url.to_string(),
            "https://scans.oss-cn-beijing.aliyuncs.com/village/index.html"
        );
    }

    #[test]
    fn base_path_drops_empty_parts() {
        assert_eq!(base_path_segments("/docs//xigou/"), vec!["docs", "xigou"]);
        assert!(base_path_segments("").is_empty());
    }

    // =========================================================================
    // Fallback and placeholder
    // =========================================================================

    #[test]
    fn fallback_without_base_path() {
        let url = fallback_url(
            &config(""),
            Path::new("/data/archive"),
            Path::new("/data/archive/village1"),
        )
        .unwrap();
        assert_eq!(
            url.to_string(),
            "https://scans.oss-cn-beijing.aliyuncs.com/archive/village1/index.html"
        );
    }

    #[test]
    fn fallback_with_base_path_and_cjk() {
        let url = fallback_url(
            &config("/档案/"),
            Path::new("/data/西沟"),
            Path::new("/data/西沟/乡/村"),
        )
        .unwrap();
        assert_eq!(url.decoded_path(), "档案/西沟/乡/村/index.html");
        assert!(url.to_string().is_ascii());
    }

    #[test]
    fn fallback_is_deterministic() {
        let root = Path::new("/data/archive");
        let target = Path::new("/data/archive/v");
        assert_eq!(
            fallback_url(&config("x"), root, target).unwrap(),
            fallback_url(&config("x"), root, target).unwrap()
        );
    }

    #[test]
    fn fallback_rejects_invalid_config() {
        let result = fallback_url(
            &StoreConfig::default(),
            Path::new("/data"),
            Path::new("/data/v"),
        );
        assert!(matches!(result, Err(UrlError::InvalidConfig(_))));
    }

    #[test]
    fn fallback_rejects_endpoint_with_path() {
        let mut cfg = config("");
        cfg.endpoint = "oss.example.com/extra".into();
        assert!(fallback_url(&cfg, Path::new("/d"), Path::new("/d/v")).is_err());
    }

    #[test]
    fn placeholder_marks_fake_bucket() {
        assert_eq!(
            placeholder_url("麻地沟村").to_string(),
            "https://your-bucket.oss-region.aliyuncs.com/%E9%BA%BB%E5%9C%B0%E6%B2%9F%E6%9D%91/index.html"
        );
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn gallery_url_passes_through_untouched() {
        let gallery = "https://scans.host/archive/%E6%9D%91/index.html";
        let resolved = resolve_canonical_url(
            &config(""),
            Path::new("/data/archive"),
            Path::new("/data/archive/村"),
            Some(gallery),
        );
        assert_eq!(resolved.url, gallery);
        assert_eq!(resolved.source, UrlSource::Gallery);
    }

    #[test]
    fn invalid_config_resolves_to_placeholder() {
        let resolved = resolve_canonical_url(
            &StoreConfig::default(),
            Path::new("/data"),
            Path::new("/data/village1"),
            None,
        );
        assert_eq!(resolved.source, UrlSource::Placeholder);
        assert!(resolved.url.contains("your-bucket"));
        assert!(resolved.url.contains("village1"));
    }

    #[test]
    fn valid_config_resolves_to_fallback() {
        let resolved = resolve_canonical_url(
            &config(""),
            Path::new("/data"),
            Path::new("/data/village1"),
            None,
        );
        assert_eq!(resolved.source, UrlSource::Fallback);
        assert_eq!(
            resolved.url,
            "https://scans.oss-cn-beijing.aliyuncs.com/data/village1/index.html"
        );
    }

    #[test]
    fn trim_last_segment_keeps_encoding() {
        assert_eq!(
            trim_last_segment("https://b.h/root/%E6%9D%91/a%20b.jpg"),
            "https://b.h/root/%E6%9D%91"
        );
        assert_eq!(trim_last_segment("https://b.h"), "https://b.h");
    }
}
