//! Storage module for remote object stores
//!
//! Defines the `ObjectStore` contract the upload pipeline talks to, and the
//! Cloudinary and MinIO/S3 clients that implement it.

mod cloudinary_client;
mod minio_client;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use cloudinary_client::CloudinaryClient;
pub use minio_client::MinIOClient;

use crate::core::config::{StorageConfig, StorageProvider};

/// Result tag a store reports for a successful delete
pub const DESTROY_OK: &str = "ok";

/// Result tag for a delete of an object that does not exist
pub const DESTROY_NOT_FOUND: &str = "not found";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Request(String),

    /// Error message reported by the store itself
    #[error("{0}")]
    Provider(String),

    #[error("Invalid response from storage provider: {0}")]
    InvalidResponse(String),

    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

/// A single object to place in the store
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub data: Vec<u8>,
    pub public_id: String,
    pub folder: String,
    /// Original filename, passed along for providers that keep it
    pub filename: String,
    /// Sniffed MIME type of `data`
    pub content_type: String,
    pub unique_filename: bool,
    pub overwrite: bool,
    /// "auto" lets the store pick image/video/raw handling
    pub resource_type: String,
}

/// What the store reports back after a successful put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub secure_url: String,
    pub public_id: String,
    /// Stored size, which may differ from the local buffer after store-side re-encoding
    pub bytes: u64,
    pub format: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    async fn put(&self, request: PutObjectRequest) -> Result<StoredObject, StorageError>;

    /// Delete an object, returning the store's result tag (`"ok"`, `"not found"`, ...)
    async fn destroy(&self, public_id: &str) -> Result<String, StorageError>;
}

/// Build the object store selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.provider {
        StorageProvider::Cloudinary => {
            let cloudinary = config.cloudinary.clone().ok_or_else(|| {
                StorageError::Configuration("Cloudinary settings are missing".to_string())
            })?;
            Ok(Arc::new(CloudinaryClient::new(cloudinary)?))
        }
        StorageProvider::MinIO => {
            let minio = config.minio.clone().ok_or_else(|| {
                StorageError::Configuration("MinIO settings are missing".to_string())
            })?;
            Ok(Arc::new(MinIOClient::new(minio).await?))
        }
    }
}
