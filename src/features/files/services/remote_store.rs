use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::features::files::dtos::{DeleteResult, UploadError, UploadResult, UploadedFile};
use crate::modules::storage::{ObjectStore, PutObjectRequest, StorageError, DESTROY_OK};
use crate::shared::validation::{FILENAME_UNSAFE_CHARS, FILE_EXTENSION};

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 9;

/// The only component that talks to the object store. Store errors never
/// escape as `Err` from the client; they come back as `UploadError` values.
pub struct RemoteStoreAdapter {
    store: Arc<dyn ObjectStore>,
    timeout: Option<Duration>,
}

impl RemoteStoreAdapter {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    /// `{sanitized stem}_{unix millis}_{base36 token}`
    pub fn generate_public_id(filename: &str) -> String {
        let sanitized = FILENAME_UNSAFE_CHARS.replace_all(filename, "_");
        let stem = FILE_EXTENSION.replace(&sanitized, "");
        let stem: &str = if stem.is_empty() { "file" } else { &stem };

        format!("{}_{}_{}", stem, Utc::now().timestamp_millis(), random_token())
    }

    pub async fn store(
        &self,
        data: Vec<u8>,
        filename: &str,
        folder: &str,
        content_type: &str,
    ) -> UploadResult {
        let public_id = Self::generate_public_id(filename);
        let local_size = data.len();

        let request = PutObjectRequest {
            data,
            public_id: public_id.clone(),
            folder: folder.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            unique_filename: true,
            overwrite: false,
            resource_type: "auto".to_string(),
        };

        debug!(
            "Storing '{}' ({} bytes) in {} under folder '{}'",
            public_id,
            local_size,
            self.store.name(),
            folder
        );

        match self.with_deadline(self.store.put(request)).await? {
            Ok(stored) => {
                info!(
                    "Uploaded file: public_id={}, size={}, format={}",
                    stored.public_id, stored.bytes, stored.format
                );
                Ok(UploadedFile {
                    url: stored.secure_url,
                    public_id: stored.public_id,
                    size: stored.bytes,
                    format: stored.format,
                })
            }
            Err(e) => {
                error!("Upload of '{}' failed: {}", public_id, e);
                Err(UploadError::Store(failure_message(&e, "Upload failed")))
            }
        }
    }

    pub async fn delete(&self, public_id: &str) -> DeleteResult {
        match self.with_deadline(self.store.destroy(public_id)).await? {
            Ok(result) if result == DESTROY_OK => {
                info!("Deleted file: public_id={}", public_id);
                Ok(())
            }
            Ok(result) => {
                warn!("Delete of '{}' returned '{}'", public_id, result);
                Err(UploadError::DeleteFailed("Failed to delete file".to_string()))
            }
            Err(e) => {
                error!("Delete of '{}' failed: {}", public_id, e);
                Err(UploadError::DeleteFailed(failure_message(
                    &e,
                    "Failed to delete file",
                )))
            }
        }
    }

    /// Run a store call under the configured deadline, if any
    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<Result<T, StorageError>, UploadError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                error!("{} call timed out after {:?}", self.store.name(), limit);
                UploadError::Timeout(limit)
            }),
            None => Ok(call.await),
        }
    }
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

fn failure_message(err: &StorageError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
