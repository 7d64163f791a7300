use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::UploadConfig;
use crate::features::files::dtos::{
    DeleteResult, UploadError, UploadOptions, UploadOptionsOverride, UploadResult,
};
use crate::features::files::services::file_type::{is_image_mime_type, sniff_mime_type};
use crate::features::files::services::image_compressor::ImageCompressor;
use crate::features::files::services::remote_store::RemoteStoreAdapter;
use crate::modules::storage::ObjectStore;

/// Local gate run before any compression or network call
pub struct UploadValidator;

impl UploadValidator {
    /// Check size and sniffed type, returning the sniffed MIME type
    pub fn validate(data: &[u8], options: &UploadOptions) -> Result<&'static str, UploadError> {
        if data.len() > options.max_size {
            return Err(UploadError::file_too_large(options.max_size));
        }

        let mime_type = sniff_mime_type(data);
        if !options.allowed_types.iter().any(|t| t == mime_type) {
            return Err(UploadError::UnsupportedType {
                detected: mime_type.to_string(),
                allowed: options.allowed_types.clone(),
            });
        }

        Ok(mime_type)
    }
}

/// Service for uploading files to and deleting files from the remote store
pub struct UploadService {
    config: UploadConfig,
    compressor: ImageCompressor,
    store: RemoteStoreAdapter,
}

impl UploadService {
    pub fn new(config: UploadConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            compressor: ImageCompressor::new(config.target_size),
            store: RemoteStoreAdapter::new(store, config.store_timeout),
            config,
        }
    }

    /// Largest upload accepted with default options
    pub fn max_file_size(&self) -> usize {
        self.config.max_file_size
    }

    /// Validate, compress images, and store a file
    ///
    /// # Arguments
    /// * `data` - The raw file content
    /// * `filename` - Client filename, used only to derive the public id
    /// * `overrides` - Caller options merged over the configured defaults
    ///
    /// # Returns
    /// The stored file, or an `UploadError` describing why it was rejected
    pub async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        overrides: UploadOptionsOverride,
    ) -> UploadResult {
        let options = UploadOptions::merged(&self.config, overrides);

        let mime_type = match UploadValidator::validate(&data, &options) {
            Ok(mime_type) => mime_type,
            Err(e) => {
                debug!("Rejected upload '{}': {}", filename, e);
                return Err(e);
            }
        };

        let (data, content_type) = if is_image_mime_type(mime_type) {
            let compressed = self
                .compressor
                .compress(&data, options.quality, options.resize)
                .await;

            match compressed {
                Ok(compressed) => {
                    info!(
                        "Compressed '{}' from {} to {} bytes (quality={}, attempts={})",
                        filename,
                        data.len(),
                        compressed.data.len(),
                        compressed.quality,
                        compressed.attempts
                    );
                    (compressed.data, compressed.mime_type)
                }
                Err(e) => {
                    warn!(
                        "Image compression failed for '{}', uploading original: {}",
                        filename, e
                    );
                    (data, mime_type)
                }
            }
        } else {
            (data, mime_type)
        };

        self.store
            .store(data, filename, &options.folder, content_type)
            .await
    }

    /// Delete a stored file by its public id
    pub async fn delete(&self, public_id: &str) -> DeleteResult {
        self.store.delete(public_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::dtos::ResizeOptions;
    use crate::shared::test_helpers::SpyStore;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn service_with(spy: Arc<SpyStore>) -> UploadService {
        UploadService::new(UploadConfig::default(), spy)
    }

    /// PNG magic bytes followed by filler that no decoder accepts
    fn fake_png(len: usize) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.resize(len, 0x42);
        data
    }

    fn real_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut buffer, format)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_validator_rejects_oversized() {
        let options = UploadOptions::default();
        let data = vec![0u8; options.max_size + 1];

        let err = UploadValidator::validate(&data, &options).unwrap_err();

        assert_eq!(err, UploadError::FileTooLarge { max_mb: 5.0 });
    }

    #[test]
    fn test_validator_accepts_exact_limit() {
        let options = UploadOptions {
            max_size: 64,
            ..UploadOptions::default()
        };

        assert_eq!(
            UploadValidator::validate(&fake_png(64), &options),
            Ok("image/png")
        );
    }

    #[test]
    fn test_validator_rejects_disallowed_type() {
        let options = UploadOptions {
            allowed_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
            ..UploadOptions::default()
        };

        let err = UploadValidator::validate(b"just some plain text here", &options).unwrap_err();

        assert!(matches!(
            err,
            UploadError::UnsupportedType { ref detected, .. } if detected == "text/plain"
        ));
        assert!(err.to_string().contains("image/png, image/jpeg"));
    }

    #[test]
    fn test_validator_is_idempotent() {
        let options = UploadOptions::default();
        let data = fake_png(128);

        assert_eq!(
            UploadValidator::validate(&data, &options),
            UploadValidator::validate(&data, &options)
        );
    }

    #[tokio::test]
    async fn test_oversized_upload_never_reaches_store() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());

        let result = service
            .upload(
                vec![0u8; 6 * 1024 * 1024],
                "big.bin",
                UploadOptionsOverride::default(),
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
        assert!(err.to_string().contains('5'));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_type_never_reaches_store() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let overrides = UploadOptionsOverride {
            allowed_types: Some(vec!["application/pdf".to_string()]),
            ..Default::default()
        };

        let result = service
            .upload(fake_png(2048), "photo.pdf", overrides)
            .await;

        assert!(matches!(result, Err(UploadError::UnsupportedType { .. })));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_then_delete_png() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());

        let uploaded = service
            .upload(fake_png(2048), "photo.png", UploadOptionsOverride::default())
            .await
            .unwrap();

        assert!(uploaded.public_id.starts_with("photo_"));
        assert!(!uploaded.url.is_empty());

        assert_eq!(service.delete(&uploaded.public_id).await, Ok(()));
    }

    #[tokio::test]
    async fn test_compression_failure_uploads_original() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let original = fake_png(2048);

        service
            .upload(original.clone(), "photo.png", UploadOptionsOverride::default())
            .await
            .unwrap();

        let puts = spy.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].data, original);
        assert_eq!(puts[0].content_type, "image/png");
        assert_eq!(puts[0].folder, "shikshaguru");
    }

    #[tokio::test]
    async fn test_images_are_compressed_before_store() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let overrides = UploadOptionsOverride {
            resize: ResizeOptions::from_dimensions(Some(64), None),
            ..Default::default()
        };

        service
            .upload(real_image(128, 96, ImageFormat::Jpeg), "avatar.jpg", overrides)
            .await
            .unwrap();

        let puts = spy.puts();
        let stored = image::load_from_memory(&puts[0].data).unwrap();
        assert_eq!((stored.width(), stored.height()), (64, 48));
        assert_eq!(puts[0].content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_gif_is_stored_as_jpeg() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let frame = RgbaImage::from_pixel(8, 8, Rgba([10, 200, 10, 255]));
        let mut gif = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(frame)
            .write_to(&mut gif, ImageFormat::Gif)
            .unwrap();

        let uploaded = service
            .upload(gif.into_inner(), "anim.gif", UploadOptionsOverride::default())
            .await
            .unwrap();

        assert_eq!(spy.puts()[0].content_type, "image/jpeg");
        assert_eq!(uploaded.format, "jpg");
    }

    #[tokio::test]
    async fn test_documents_are_not_compressed() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let pdf = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n".to_vec();

        let uploaded = service
            .upload(pdf.clone(), "syllabus.pdf", UploadOptionsOverride::default())
            .await
            .unwrap();

        assert_eq!(spy.puts()[0].data, pdf);
        assert_eq!(uploaded.format, "pdf");
        assert!(uploaded.public_id.starts_with("syllabus_"));
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_ids() {
        let spy = Arc::new(SpyStore::new());
        let service = service_with(spy.clone());
        let data = b"identical lesson plan content".to_vec();

        let (first, second) = tokio::join!(
            service.upload(data.clone(), "plan.txt", UploadOptionsOverride::default()),
            service.upload(data.clone(), "plan.txt", UploadOptionsOverride::default()),
        );

        assert_ne!(first.unwrap().public_id, second.unwrap().public_id);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned_unmodified() {
        let spy = Arc::new(SpyStore::failing_puts("Invalid API key"));
        let service = service_with(spy.clone());

        let result = service
            .upload(
                b"%PDF-1.4 fee receipt".to_vec(),
                "receipt.pdf",
                UploadOptionsOverride::default(),
            )
            .await;

        assert_eq!(
            result,
            Err(UploadError::Store("Invalid API key".to_string()))
        );
        assert_eq!(spy.puts().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_fails() {
        let service = service_with(Arc::new(SpyStore::new()));

        assert_eq!(
            service.delete("shikshaguru/never_uploaded").await,
            Err(UploadError::DeleteFailed("Failed to delete file".to_string()))
        );
    }
}
