use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::features::files::services::file_type::extension_for_mime_type;
use crate::modules::storage::{
    ObjectStore, PutObjectRequest, StorageError, StoredObject, DESTROY_NOT_FOUND, DESTROY_OK,
};

/// In-memory object store that records every call it receives.
/// Public ids are echoed back unchanged.
#[derive(Default)]
pub struct SpyStore {
    puts: Mutex<Vec<PutObjectRequest>>,
    destroys: Mutex<Vec<String>>,
    stored: Mutex<HashSet<String>>,
    put_error: Option<String>,
    destroy_error: Option<String>,
    delay: Option<Duration>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every put fails with `message` as the provider error
    pub fn failing_puts(message: &str) -> Self {
        Self {
            put_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Every destroy fails with `message` as a transport error
    pub fn failing_destroys(message: &str) -> Self {
        Self {
            destroy_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Sleep before answering, to exercise deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn puts(&self) -> Vec<PutObjectRequest> {
        self.puts.lock().unwrap().clone()
    }

    pub fn destroys(&self) -> Vec<String> {
        self.destroys.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.puts.lock().unwrap().len() + self.destroys.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for SpyStore {
    fn name(&self) -> &'static str {
        "spy"
    }

    async fn put(&self, request: PutObjectRequest) -> Result<StoredObject, StorageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.puts.lock().unwrap().push(request.clone());

        if let Some(message) = &self.put_error {
            return Err(StorageError::Provider(message.clone()));
        }

        let public_id = request.public_id.clone();
        let format = extension_for_mime_type(&request.content_type)
            .unwrap_or("")
            .to_string();

        self.stored.lock().unwrap().insert(public_id.clone());

        Ok(StoredObject {
            secure_url: format!(
                "https://res.example.com/upload/{}/{}.{}",
                request.folder, public_id, format
            ),
            public_id,
            bytes: request.data.len() as u64,
            format,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<String, StorageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.destroys.lock().unwrap().push(public_id.to_string());

        if let Some(message) = &self.destroy_error {
            return Err(StorageError::Request(message.clone()));
        }

        if self.stored.lock().unwrap().remove(public_id) {
            Ok(DESTROY_OK.to_string())
        } else {
            Ok(DESTROY_NOT_FOUND.to_string())
        }
    }
}
