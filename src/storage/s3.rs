//! AWS S3 storage implementation.
//!
//! Each role maps to its own bucket; keys are used as-is.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::StorageConfig;
use crate::storage::{ArtifactStore, BucketRole};

/// S3-backed artifact storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    raw_bucket: String,
    processed_bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(
        client: Client,
        raw_bucket: impl Into<String>,
        processed_bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            raw_bucket: raw_bucket.into(),
            processed_bucket: processed_bucket.into(),
        }
    }

    /// Create S3 storage using the default AWS credential chain.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&sdk_config);
        info!(
            "Using S3 storage: raw={}, processed={}",
            config.raw_bucket, config.processed_bucket
        );
        Ok(Self::new(
            client,
            &config.raw_bucket,
            &config.processed_bucket,
        ))
    }

    fn bucket(&self, role: BucketRole) -> &str {
        match role {
            BucketRole::Raw => &self.raw_bucket,
            BucketRole::Processed => &self.processed_bucket,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Storage {
    async fn put(&self, role: BucketRole, key: &str, body: Vec<u8>) -> Result<()> {
        let bucket = self.bucket(role);
        let size = body.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "put s3://{}/{}: {}",
                    bucket,
                    key,
                    e.into_service_error()
                ))
            })?;

        debug!("Wrote {} bytes to s3://{}/{}", size, bucket, key);
        Ok(())
    }

    async fn get(&self, role: BucketRole, key: &str) -> Result<Option<Vec<u8>>> {
        let bucket = self.bucket(role);
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(|e| {
                    AppError::storage(format!("read s3://{}/{}: {}", bucket, key, e))
                })?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    info!("No object at s3://{}/{}", bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::storage(format!(
                        "get s3://{}/{}: {}",
                        bucket, key, service_err
                    )))
                }
            }
        }
    }

    fn describe(&self, role: BucketRole, key: &str) -> String {
        format!("s3://{}/{}", self.bucket(role), key)
    }
}
