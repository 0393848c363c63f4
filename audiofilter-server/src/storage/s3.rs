//! S3-compatible object store (MinIO, AWS S3)

use std::time::Duration;

use async_trait::async_trait;
use audiofilter_common::config::S3Settings;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use axum::body::Bytes;
use tracing::debug;

use super::{generate_object_key, ObjectStore, StorageError};

/// Object store backed by an S3 bucket
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    presign_expiry: Duration,
}

impl S3ObjectStore {
    /// Create a client with static credentials against the configured endpoint.
    ///
    /// Path-style addressing is forced so MinIO deployments without
    /// wildcard DNS work.
    pub async fn new(settings: &S3Settings, presign_expiry: Duration) -> Self {
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "audiofilter-config",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self::from_client(
            S3Client::from_conf(s3_config),
            settings.bucket.clone(),
            presign_expiry,
        )
    }

    /// Wrap an existing client
    pub fn from_client(client: S3Client, bucket: String, presign_expiry: Duration) -> Self {
        Self {
            client,
            bucket,
            presign_expiry,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        data: Bytes,
        size: u64,
        content_type: &str,
        suggested_name: &str,
    ) -> Result<String, StorageError> {
        let key = generate_object_key(suggested_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::Write(DisplayErrorContext(&err).to_string()))?;

        debug!(bucket = %self.bucket, key = %key, size, "Stored object");
        Ok(key)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Read(
                        DisplayErrorContext(&service_err).to_string(),
                    ))
                }
            }
        }
    }

    async fn presigned_get_url(&self, key: &str) -> Result<String, StorageError> {
        // Signing is local and would happily sign a URL for a missing key
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|err| StorageError::Url(err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::Url(DisplayErrorContext(&err).to_string()))?;

        Ok(request.uri().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
