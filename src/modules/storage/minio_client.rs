//! MinIO/S3-compatible storage client
//!
//! Alternative backend for deployments that keep uploads in their own
//! bucket. Objects live under `{folder}/{public_id}.{ext}` and the object key
//! minus its extension doubles as the public id handed back to callers.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::{
    ObjectStore, PutObjectRequest, StorageError, StoredObject, DESTROY_NOT_FOUND, DESTROY_OK,
};
use crate::core::config::MinIOConfig;
use crate::features::files::services::file_type::extension_for_mime_type;

pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    public_endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client and make sure its bucket exists
    pub async fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Configuration(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Configuration(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs (http://endpoint/bucket) for MinIO
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
        };

        client.ensure_bucket_exists().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}",
            config.endpoint,
            client.bucket.name()
        );

        Ok(client)
    }

    /// Create the bucket unless it is already there. Failures are logged, not fatal.
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Object key for a public id: `{folder}/{id}.{ext}`
    pub fn object_key(folder: &str, public_id: &str, extension: &str) -> String {
        let folder = folder.trim_matches('/');
        let name = if extension.is_empty() {
            public_id.to_string()
        } else {
            format!("{}.{}", public_id, extension)
        };

        if folder.is_empty() {
            name
        } else {
            format!("{}/{}", folder, name)
        }
    }

    fn file_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }

    /// Find the stored key for a public id by trying the known extensions
    async fn find_key(&self, public_id: &str) -> Result<Option<String>, StorageError> {
        let candidates = ["jpg", "png", "gif", "webp", "pdf", "txt", ""];
        for extension in candidates {
            let key = Self::object_key("", public_id, extension);
            if self.exists(&key).await? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) if status < 300 => Ok(true),
            Ok((_, status)) => Err(StorageError::Provider(format!(
                "MinIO returned status {} checking '{}'",
                status, key
            ))),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("404") || error_str.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Request(format!(
                        "Failed to check if file '{}' exists: {}",
                        key, e
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for MinIOClient {
    fn name(&self) -> &'static str {
        "minio"
    }

    async fn put(&self, request: PutObjectRequest) -> Result<StoredObject, StorageError> {
        let extension = extension_for_mime_type(&request.content_type).unwrap_or("");
        let key = Self::object_key(&request.folder, &request.public_id, extension);

        if !request.overwrite && self.exists(&key).await? {
            return Err(StorageError::Provider(format!(
                "Object '{}' already exists",
                key
            )));
        }

        let response = self
            .bucket
            .put_object_with_content_type(&key, &request.data, &request.content_type)
            .await
            .map_err(|e| StorageError::Request(format!("Failed to upload file '{}': {}", key, e)))?;

        if response.status_code() >= 300 {
            return Err(StorageError::Provider(format!(
                "MinIO returned status {} for '{}'",
                response.status_code(),
                key
            )));
        }

        debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());

        let public_id = key
            .strip_suffix(&format!(".{}", extension))
            .filter(|_| !extension.is_empty())
            .unwrap_or(&key)
            .to_string();

        Ok(StoredObject {
            secure_url: self.file_url(&key),
            public_id,
            bytes: request.data.len() as u64,
            format: extension.to_string(),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<String, StorageError> {
        let Some(key) = self.find_key(public_id).await? else {
            return Ok(DESTROY_NOT_FOUND.to_string());
        };

        let response = self
            .bucket
            .delete_object(&key)
            .await
            .map_err(|e| StorageError::Request(format!("Failed to delete file '{}': {}", key, e)))?;

        match response.status_code() {
            404 => return Ok(DESTROY_NOT_FOUND.to_string()),
            status if status >= 300 => {
                return Err(StorageError::Provider(format!(
                    "MinIO returned status {} deleting '{}'",
                    status, key
                )));
            }
            _ => {}
        }

        debug!("Deleted file '{}' from bucket '{}'", key, self.bucket.name());
        Ok(DESTROY_OK.to_string())
    }
}
