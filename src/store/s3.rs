//! S3-compatible store client.
//!
//! Aliyun OSS, MinIO and AWS S3 all accept the same requests. Credentials come
//! only from the [`StoreConfig`]; the environment is never consulted. The
//! client is async, so each store owns a current-thread runtime and blocks on
//! every request. Uploads stay strictly sequential.

use super::{ObjectKey, RemoteStore, StoreError, object_url};
use crate::config::StoreConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;
use tracing::{debug, info};

pub struct S3Store {
    client: Client,
    bucket: String,
    config: StoreConfig,
    runtime: Runtime,
}

impl S3Store {
    /// Build a client for a valid config. No request is sent.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        if !config.is_valid() {
            return Err(StoreError::NotConfigured);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Runtime(e.to_string()))?;

        let credentials = Credentials::new(
            config.access_key_id.trim(),
            config.access_key_secret.trim(),
            None,
            None,
            "qr-sheets",
        );
        let s3_config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region()))
            .endpoint_url(format!("https://{}", config.bare_host()))
            .credentials_provider(credentials)
            .build();

        info!(
            bucket = %config.bucket_name,
            endpoint = %config.bare_host(),
            region = %config.region(),
            "object store client initialized"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket_name.trim().to_string(),
            config: config.clone(),
            runtime,
        })
    }
}

impl RemoteStore for S3Store {
    fn upload(
        &self,
        key: &ObjectKey,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let key_str = key.to_string();
        let size_bytes = body.len();
        debug!(key = %key_str, size_bytes, "uploading object");

        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key_str)
                    .body(ByteStream::from(body))
                    .content_type(content_type)
                    .send(),
            )
            .map_err(|e| StoreError::Upload {
                key: key_str.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(key = %key_str, "object uploaded");
        Ok(object_url(&self.config, key).to_string())
    }

    fn test_connection(&self) -> Result<(), StoreError> {
        self.runtime
            .block_on(
                self.client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .max_keys(1)
                    .send(),
            )
            .map_err(|e| StoreError::Connection(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
