//! Content type detection from leading bytes
//!
//! Filenames and client-supplied `Content-Type` headers are untrusted, so the
//! pipeline classifies uploads by their magic numbers alone.

use crate::shared::constants::{MIME_GIF, MIME_JPEG, MIME_PDF, MIME_PNG, MIME_TEXT, MIME_WEBP};

/// Buffers shorter than this are never recognized
const MIN_SNIFF_LEN: usize = 12;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const GIF_MAGIC: &[u8] = b"GIF";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_MAGIC: &[u8] = b"WEBP";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Classify a buffer by its magic bytes, falling back to `text/plain`
pub fn sniff_mime_type(data: &[u8]) -> &'static str {
    if data.len() < MIN_SNIFF_LEN {
        return MIME_TEXT;
    }

    if data.starts_with(JPEG_MAGIC) {
        MIME_JPEG
    } else if data.starts_with(PNG_MAGIC) {
        MIME_PNG
    } else if data.starts_with(GIF_MAGIC) {
        MIME_GIF
    } else if data.starts_with(RIFF_MAGIC) && &data[8..12] == WEBP_MAGIC {
        MIME_WEBP
    } else if data.starts_with(PDF_MAGIC) {
        MIME_PDF
    } else {
        MIME_TEXT
    }
}

pub fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Get file extension from content type
pub fn extension_for_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        MIME_JPEG => Some("jpg"),
        MIME_PNG => Some("png"),
        MIME_GIF => Some("gif"),
        MIME_WEBP => Some("webp"),
        MIME_PDF => Some("pdf"),
        MIME_TEXT => Some("txt"),
        _ => None,
    }
}
