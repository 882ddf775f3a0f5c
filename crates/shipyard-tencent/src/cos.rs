//! COS buckets through the S3-compatible endpoint.

use std::path::Path;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use shipyard_upload::{ObjectStore, StoreError};

use crate::credential::Credential;

pub fn endpoint(region: &str) -> String {
    format!("https://cos.{region}.myqcloud.com")
}

/// [`ObjectStore`] backed by a COS bucket (`<name>-<appid>`).
#[derive(Debug, Clone)]
pub struct CosStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl CosStore {
    pub async fn connect(credential: &Credential, region: &str, bucket: impl Into<String>) -> Self {
        let credentials = Credentials::new(
            credential.secret_id.clone(),
            credential.secret_key.clone(),
            credential.token.clone(),
            None,
            "tencent-cloud",
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint(region))
            .credentials_provider(credentials)
            .load()
            .await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ObjectStore for CosStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StoreError::Rejected {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            }),
        }
    }

    async fn put_file(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(bucket = %self.bucket, %key, size = bytes.len(), "putting object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StoreError::Rejected {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_regional() {
        assert_eq!(endpoint("ap-shanghai"), "https://cos.ap-shanghai.myqcloud.com");
    }
}
