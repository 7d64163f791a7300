// =============================================================================
// UPLOAD DEFAULTS
// =============================================================================

/// Folder uploads are stored under when the caller does not pick one
pub const DEFAULT_UPLOAD_FOLDER: &str = "shikshaguru";

/// Maximum upload size in bytes (5MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Initial encode quality for image compression
pub const DEFAULT_QUALITY: u8 = 80;

/// Byte budget the image compressor works toward (512KB)
pub const IMAGE_TARGET_SIZE: usize = 512 * 1024;

/// Lowest quality the compressor will step down to
pub const MIN_IMAGE_QUALITY: u8 = 20;

/// Quality decrement between compression attempts
pub const QUALITY_STEP: u8 = 10;

/// Extra request body allowance for multipart framing (1MB)
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// =============================================================================
// MIME TYPES
// =============================================================================

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_WEBP: &str = "image/webp";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Types accepted when the caller does not restrict them
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    MIME_JPEG, MIME_PNG, MIME_GIF, MIME_WEBP, MIME_PDF, MIME_TEXT,
];
