//! Object store capability.
//!
//! The pipeline only depends on the [`RemoteStore`] trait: upload bytes under
//! a key and get a public URL back, plus a connection check. [`S3Store`] is
//! the production implementation for S3-compatible stores such as Aliyun OSS.
//!
//! ## Object keys
//!
//! ```text
//! {basePath/}{rootName}/{relativePath}/{fileName}
//! ```
//!
//! The directory part is the same one [`crate::url::fallback_url`] uses, so
//! the computed gallery URL of a directory points at the location an upload
//! of that directory populates.

mod s3;

pub use s3::S3Store;

use crate::config::StoreConfig;
use crate::url::{PublicUrl, base_path_segments, bucket_host, directory_segments};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object store is not configured")]
    NotConfigured,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },
    #[error("Connection test failed: {0}")]
    Connection(String),
    #[error("Async runtime error: {0}")]
    Runtime(String),
}

/// Object-storage client used by the pipeline.
pub trait RemoteStore {
    /// Upload `body` under `key`. Returns the object's public URL.
    fn upload(&self, key: &ObjectKey, body: Vec<u8>, content_type: &str)
    -> Result<String, StoreError>;

    /// Check credentials and bucket access.
    fn test_connection(&self) -> Result<(), StoreError>;
}

/// A store object path, held as raw (unencoded) segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectKey {
    segments: Vec<String>,
}

impl ObjectKey {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Key for `file_name` inside `target`, laid out relative to `root`.
    pub fn for_file(config: &StoreConfig, root: &Path, target: &Path, file_name: &str) -> Self {
        let mut segments = base_path_segments(&config.base_path);
        segments.extend(directory_segments(root, target));
        segments.push(file_name.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Public URL of `key` in the configured bucket.
///
/// Deterministic: the same config and key always give the same URL.
pub fn object_url(config: &StoreConfig, key: &ObjectKey) -> PublicUrl {
    PublicUrl::from_segments(bucket_host(config), key.segments())
}

/// A local file that has been uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub local_path: PathBuf,
    pub remote_key: ObjectKey,
    pub public_url: String,
}

impl UploadedAsset {
    /// File name shown in the gallery.
    pub fn display_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.remote_key.to_string())
    }
}

/// MIME type sent with an upload, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "html" | "htm" => "text/html; charset=utf-8",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Read `local_path` and upload it under `key`.
pub fn upload_file(
    store: &dyn RemoteStore,
    local_path: &Path,
    key: ObjectKey,
) -> Result<UploadedAsset, StoreError> {
    let body = fs::read(local_path)?;
    let public_url = store.upload(&key, body, content_type_for(local_path))?;
    Ok(UploadedAsset {
        local_path: local_path.to_path_buf(),
        remote_key: key,
        public_url,
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store that records uploads and fails on request.
    ///
    /// URLs are derived from `config` exactly like a real upload would.
    #[derive(Default)]
    pub struct MockStore {
        pub config: StoreConfig,
        /// Keys whose last segment is in this set fail to upload.
        pub failing_names: HashSet<String>,
        pub connection_error: Option<String>,
        pub uploads: Mutex<Vec<RecordedUpload>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedUpload {
        pub key: String,
        pub content_type: String,
        pub body: Vec<u8>,
    }

    impl MockStore {
        pub fn new(config: StoreConfig) -> Self {
            Self {
                config,
                ..Self::default()
            }
        }

        pub fn failing_on(config: StoreConfig, names: &[&str]) -> Self {
            Self {
                config,
                failing_names: names.iter().map(|n| n.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn get_uploads(&self) -> Vec<RecordedUpload> {
            self.uploads.lock().unwrap().clone()
        }

        pub fn uploaded_keys(&self) -> Vec<String> {
            self.get_uploads().into_iter().map(|u| u.key).collect()
        }
    }

    impl RemoteStore for MockStore {
        fn upload(
            &self,
            key: &ObjectKey,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<String, StoreError> {
            let name = key.segments().last().cloned().unwrap_or_default();
            if self.failing_names.contains(&name) {
                return Err(StoreError::Upload {
                    key: key.to_string(),
                    message: "simulated failure".into(),
                });
            }
            self.uploads.lock().unwrap().push(RecordedUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                body,
            });
            Ok(object_url(&self.config, key).to_string())
        }

        fn test_connection(&self) -> Result<(), StoreError> {
            match &self.connection_error {
                Some(message) => Err(StoreError::Connection(message.clone())),
                None => Ok(()),
            }
        }
    }

    pub fn valid_config() -> StoreConfig {
        StoreConfig {
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            endpoint: "oss-cn-beijing.aliyuncs.com".into(),
            bucket_name: "scans".into(),
            base_path: String::new(),
        }
    }

    #[test]
    fn key_includes_base_root_and_relative_path() {
        let mut config = valid_config();
        config.base_path = "/docs/".into();
        let key = ObjectKey::for_file(
            &config,
            Path::new("/data/archive"),
            Path::new("/data/archive/township/village"),
            "001.jpg",
        );
        assert_eq!(key.to_string(), "docs/archive/township/village/001.jpg");
    }

    #[test]
    fn key_under_filesystem_root_has_no_leading_slash() {
        let key = ObjectKey::for_file(
            &valid_config(),
            Path::new("/"),
            Path::new("/village"),
            "a.jpg",
        );
        assert_eq!(key.to_string(), "village/a.jpg");
    }

    #[test]
    fn object_url_encodes_key_segments() {
        let key = ObjectKey::new(vec!["档案".into(), "a b.jpg".into()]);
        assert_eq!(
            object_url(&valid_config(), &key).to_string(),
            "https://scans.oss-cn-beijing.aliyuncs.com/%E6%A1%A3%E6%A1%88/a%20b.jpg"
        );
    }

    #[test]
    fn index_key_matches_fallback_url() {
        let config = valid_config();
        let root = Path::new("/data/archive");
        let target = Path::new("/data/archive/t/v");
        let key = ObjectKey::for_file(&config, root, target, crate::url::INDEX_PAGE);
        assert_eq!(
            object_url(&config, &key),
            crate::url::fallback_url(&config, root, target).unwrap()
        );
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("x.bin")), "application/octet-stream");
    }

    #[test]
    fn upload_file_reads_bytes_and_returns_asset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        std::fs::write(&path, b"png bytes").unwrap();
        let store = MockStore::new(valid_config());

        let asset = upload_file(&store, &path, ObjectKey::new(vec!["r".into(), "a.png".into()]))
            .unwrap();
        assert_eq!(asset.display_name(), "a.png");
        assert_eq!(asset.public_url, "https://scans.oss-cn-beijing.aliyuncs.com/r/a.png");

        let uploads = store.get_uploads();
        assert_eq!(uploads[0].body, b"png bytes");
        assert_eq!(uploads[0].content_type, "image/png");
    }

    #[test]
    fn upload_file_missing_local_file_is_io_error() {
        let store = MockStore::new(valid_config());
        let result = upload_file(
            &store,
            Path::new("/nonexistent/a.jpg"),
            ObjectKey::new(vec!["a.jpg".into()]),
        );
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.get_uploads().is_empty());
    }

    #[test]
    fn mock_fails_scripted_names() {
        let store = MockStore::failing_on(valid_config(), &["bad.jpg"]);
        let result = store.upload(&ObjectKey::new(vec!["bad.jpg".into()]), vec![], "image/jpeg");
        assert!(matches!(result, Err(StoreError::Upload { .. })));
    }
}
