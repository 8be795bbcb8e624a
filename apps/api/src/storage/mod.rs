//! Storage Gateway: whole-object downloads of previously uploaded files.

use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectError;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage request failed: {0}")]
    Upstream(String),
}

/// Object store holding uploaded document files, keyed by stored path.
///
/// Carried in `AppState` as `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;
}

/// S3 / MinIO-backed object store bound to a single bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                GetObjectError::NoSuchKey(_) => StorageError::NotFound(path.to_string()),
                other => StorageError::Upstream(format!("s3://{}/{path}: {other}", self.bucket)),
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Upstream(format!("reading s3://{}/{path}: {e}", self.bucket)))?;

        Ok(body.into_bytes())
    }
}
