//! S3-compatible storage client
//!
//! Targets AWS S3 by default, or MinIO/LocalStack when a custom endpoint is
//! configured (path-style addressing).
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::{ObjectStore, StorageError, StorageResult};
use crate::core::config::StorageConfig;

/// S3-compatible object store
pub struct S3Storage {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl S3Storage {
    /// Create a new client from configuration.
    ///
    /// Static keys are used when configured, otherwise the default AWS
    /// credential chain (environment, profile, instance metadata).
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let credentials = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            }
            _ => Credentials::default(),
        }
        .map_err(|e| StorageError::Config(format!("Failed to load S3 credentials: {}", e)))?;

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|e| StorageError::Config(format!("Invalid S3 region: {}", e)))?,
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Config(format!("Failed to create S3 bucket handle: {}", e)))?;

        // Custom endpoints (MinIO) need path-style URLs: http://endpoint/bucket
        let path_style = config.endpoint.is_some();
        if path_style {
            bucket.set_path_style();
        }

        info!(
            "S3 storage configured for bucket: {}, endpoint: {}",
            bucket.name(),
            config.endpoint.as_deref().unwrap_or("aws")
        );

        Ok(Self {
            bucket,
            region,
            credentials,
            path_style,
        })
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        let name = self.bucket.name();
        let result = if self.path_style {
            Bucket::create_with_path_style(
                &name,
                self.region.clone(),
                self.credentials.clone(),
                BucketConfiguration::default(),
            )
            .await
        } else {
            Bucket::create(
                &name,
                self.region.clone(),
                self.credentials.clone(),
                BucketConfiguration::default(),
            )
            .await
        };

        match result {
            Ok(response) if response.success() => {
                info!("Bucket '{}' created successfully", name);
                Ok(())
            }
            Ok(response) => {
                debug!(
                    "Bucket '{}' not created (HTTP {}), assuming it exists",
                    name, response.response_code
                );
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", name);
                } else {
                    // Log warning but don't fail - credentials may lack CreateBucket
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        name, e
                    );
                }
                Ok(())
            }
        }
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| StorageError::UploadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !is_success(response.status_code()) {
            return Err(StorageError::UploadFailed {
                key: key.to_string(),
                reason: format!("HTTP {}", response.status_code()),
            });
        }

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StorageError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !is_success(response.status_code()) {
            return Err(StorageError::DeleteFailed {
                key: key.to_string(),
                reason: format!("HTTP {}", response.status_code()),
            });
        }

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => Ok(is_success(status)),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("404") || error_str.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(format!(
                        "Failed to check if '{}' exists: {}",
                        key, e
                    )))
                }
            }
        }
    }
}
