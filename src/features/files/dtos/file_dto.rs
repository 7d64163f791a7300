use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

use crate::core::config::UploadConfig;
use crate::shared::validation::PUBLIC_ID_REGEX;

/// Target box for resizing; missing sides are unconstrained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeOptions {
    /// `None` when neither side is set
    pub fn from_dimensions(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        (width.is_some() || height.is_some()).then_some(Self { width, height })
    }
}

/// Fully resolved options for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: String,
    pub max_size: usize,
    pub allowed_types: Vec<String>,
    pub quality: u8,
    pub resize: Option<ResizeOptions>,
}

/// Caller-supplied options; anything left `None` falls back to the defaults
#[derive(Debug, Clone, Default)]
pub struct UploadOptionsOverride {
    pub folder: Option<String>,
    pub max_size: Option<usize>,
    pub allowed_types: Option<Vec<String>>,
    pub quality: Option<u8>,
    pub resize: Option<ResizeOptions>,
}

impl UploadOptions {
    pub fn defaults(config: &UploadConfig) -> Self {
        Self {
            folder: config.default_folder.clone(),
            max_size: config.max_file_size,
            allowed_types: config.allowed_types(),
            quality: config.default_quality,
            resize: None,
        }
    }

    /// Merge caller overrides over the configured defaults
    pub fn merged(config: &UploadConfig, overrides: UploadOptionsOverride) -> Self {
        let defaults = Self::defaults(config);

        Self {
            folder: overrides
                .folder
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.folder),
            max_size: overrides.max_size.unwrap_or(defaults.max_size),
            allowed_types: overrides.allowed_types.unwrap_or(defaults.allowed_types),
            quality: overrides.quality.unwrap_or(defaults.quality).min(100),
            resize: overrides.resize,
        }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::defaults(&UploadConfig::default())
    }
}

/// A file the remote store accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Canonical HTTPS URL of the stored file
    pub url: String,
    /// Identifier to pass to delete
    pub public_id: String,
    /// Size in bytes as reported by the store
    pub size: u64,
    /// File format as reported by the store (e.g. "jpg", "pdf")
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("File too large. Maximum size is {}MB", format_mb(.max_mb))]
    FileTooLarge { max_mb: f64 },

    #[error("File type {detected} is not allowed. Allowed types: {}", .allowed.join(", "))]
    UnsupportedType {
        detected: String,
        allowed: Vec<String>,
    },

    #[error("{0}")]
    Store(String),

    #[error("Storage call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    DeleteFailed(String),
}

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

impl UploadError {
    /// Size rejection for a limit given in bytes
    pub fn file_too_large(max_size: usize) -> Self {
        UploadError::FileTooLarge {
            max_mb: max_size as f64 / BYTES_PER_MB,
        }
    }
}

/// `5.0` -> "5", `2.5` -> "2.5"
fn format_mb(mb: &f64) -> String {
    let rounded = (mb * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as u64)
    } else {
        format!("{}", rounded)
    }
}

pub type UploadResult = std::result::Result<UploadedFile, UploadError>;

pub type DeleteResult = std::result::Result<(), UploadError>;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Destination folder, defaults to "shikshaguru"
    #[schema(example = "avatars")]
    pub folder: Option<String>,
    /// Initial image quality (0-100), defaults to 80
    #[schema(example = 80)]
    pub quality: Option<u8>,
    /// Maximum width for images
    pub width: Option<u32>,
    /// Maximum height for images
    pub height: Option<u32>,
}

/// Request DTO for deleting a file by public id
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteFileDto {
    /// Public id returned by the upload endpoint
    #[validate(length(min = 1, max = 512, message = "public_id is required"))]
    #[validate(regex(path = *PUBLIC_ID_REGEX, message = "Invalid public_id format"))]
    pub public_id: String,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}
