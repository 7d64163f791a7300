//! Cloudinary storage client
//!
//! Talks to the Cloudinary REST upload API with signed requests. Uploads go
//! through the `auto` resource endpoint so Cloudinary decides between image,
//! video and raw handling.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{ObjectStore, PutObjectRequest, StorageError, StoredObject, DESTROY_NOT_FOUND};
use crate::core::config::CloudinaryConfig;

/// Successful upload payload (only the fields the pipeline reads)
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    bytes: u64,
    /// Absent for raw resources
    #[serde(default)]
    format: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct CloudinaryClient {
    config: CloudinaryConfig,
    http_client: Client,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let http_client = Client::builder()
            .user_agent("ShikshaguruUploads/0.1")
            .build()
            .map_err(|e| StorageError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Cloudinary client initialized for cloud: {}",
            config.cloud_name
        );

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.api_base_url, self.config.cloud_name, resource_type, action
        )
    }

    /// Sign request parameters the way Cloudinary expects: sort by key, join
    /// as `k=v&k=v`, append the API secret, hex-encode the SHA-256 digest.
    ///
    /// Empty values are left out of the signature, matching the server.
    pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
        let mut signed: Vec<&(&str, String)> =
            params.iter().filter(|(_, value)| !value.is_empty()).collect();
        signed.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = signed
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        hex::encode(Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
    }

    /// Turn a non-2xx response into a `StorageError::Provider`
    async fn provider_error(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => StorageError::Provider(parsed.error.message),
            Err(_) if body.is_empty() => {
                StorageError::Provider(format!("Cloudinary returned {}", status))
            }
            Err(_) => StorageError::Provider(format!("Cloudinary returned {}: {}", status, body)),
        }
    }

    async fn destroy_resource(
        &self,
        resource_type: &str,
        public_id: &str,
    ) -> Result<String, StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let params = vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = Self::sign(&params, &self.config.api_secret);

        let response = self
            .http_client
            .post(self.endpoint(resource_type, "destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("Failed to reach Cloudinary: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        debug!(
            "Cloudinary {} destroy '{}' returned '{}'",
            resource_type, public_id, destroyed.result
        );

        Ok(destroyed.result)
    }
}

#[async_trait]
impl ObjectStore for CloudinaryClient {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    async fn put(&self, request: PutObjectRequest) -> Result<StoredObject, StorageError> {
        let timestamp = Utc::now().timestamp().to_string();

        let params = vec![
            ("folder", request.folder.clone()),
            ("overwrite", request.overwrite.to_string()),
            ("public_id", request.public_id.clone()),
            ("timestamp", timestamp),
            ("unique_filename", request.unique_filename.to_string()),
        ];
        let signature = Self::sign(&params, &self.config.api_secret);

        let file_part = Part::bytes(request.data)
            .file_name(request.filename.clone())
            .mime_str(&request.content_type)
            .map_err(|e| StorageError::Request(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            if !value.is_empty() {
                form = form.text(key, value);
            }
        }
        let form = form.part("file", file_part);

        let response = self
            .http_client
            .post(self.endpoint(&request.resource_type, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("Failed to reach Cloudinary: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        debug!(
            "Uploaded '{}' to Cloudinary ({} bytes)",
            uploaded.public_id, uploaded.bytes
        );

        Ok(StoredObject {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
            bytes: uploaded.bytes,
            format: uploaded.format,
        })
    }

    /// Plain text and other non-media `auto` uploads are stored as `raw`,
    /// so a miss under `image` is retried there
    async fn destroy(&self, public_id: &str) -> Result<String, StorageError> {
        let result = self.destroy_resource("image", public_id).await?;
        if result != DESTROY_NOT_FOUND {
            return Ok(result);
        }

        self.destroy_resource("raw", public_id).await
    }
}
