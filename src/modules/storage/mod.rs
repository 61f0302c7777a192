//! Storage module for invoice files
//!
//! Defines the `ObjectStore` seam used by the upload saga and its
//! S3-compatible implementation.

mod s3_client;

pub use s3_client::S3Storage;

use async_trait::async_trait;
use thiserror::Error;

/// Object store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed for '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    #[error("Delete failed for '{key}': {reason}")]
    DeleteFailed { key: String, reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable blob storage keyed by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` at `key`, replacing any existing object
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Remove the object at `key`
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Whether an object is stored at `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
