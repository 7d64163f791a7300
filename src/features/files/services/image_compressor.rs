//! Image recompression toward a byte budget
//!
//! Images are decoded once, optionally shrunk to fit a box, then re-encoded in
//! their own format family with decreasing quality until the output fits the
//! target size or the quality floor is reached. Every attempt encodes from the
//! decoded original so quality loss never compounds.

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::features::files::dtos::ResizeOptions;
use crate::shared::constants::{
    IMAGE_TARGET_SIZE, MIME_JPEG, MIME_PNG, MIME_WEBP, MIN_IMAGE_QUALITY, QUALITY_STEP,
};

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Unrecognized image format: {0}")]
    UnknownFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Compression task failed: {0}")]
    Task(String),
}

/// Output of a compression run
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    /// MIME type of `data`, which differs from the input for normalized formats
    pub mime_type: &'static str,
    /// Quality used for the accepted encode
    pub quality: u8,
    /// Number of encodes performed
    pub attempts: u32,
}

/// Encoder family an image is written back as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    ProgressiveJpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Anything that is not PNG or WEBP is normalized to JPEG
    fn for_source(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => OutputFormat::Png,
            ImageFormat::WebP => OutputFormat::WebP,
            _ => OutputFormat::ProgressiveJpeg,
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::ProgressiveJpeg => MIME_JPEG,
            OutputFormat::Png => MIME_PNG,
            OutputFormat::WebP => MIME_WEBP,
        }
    }

    /// PNG output is lossless, so lowering quality changes nothing
    fn honours_quality(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

#[derive(Debug, Clone)]
pub struct ImageCompressor {
    target_size: usize,
}

impl ImageCompressor {
    pub fn new(target_size: usize) -> Self {
        Self { target_size }
    }

    /// Compress on the blocking pool. A panic inside a codec surfaces as
    /// `CompressionError::Task`.
    pub async fn compress(
        &self,
        data: &[u8],
        quality: u8,
        resize: Option<ResizeOptions>,
    ) -> Result<CompressedImage, CompressionError> {
        let compressor = self.clone();
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || compressor.compress_blocking(&data, quality, resize))
            .await
            .map_err(|e| CompressionError::Task(e.to_string()))?
    }

    pub fn compress_blocking(
        &self,
        data: &[u8],
        quality: u8,
        resize: Option<ResizeOptions>,
    ) -> Result<CompressedImage, CompressionError> {
        let source_format =
            image::guess_format(data).map_err(|e| CompressionError::UnknownFormat(e.to_string()))?;
        let original = image::load_from_memory_with_format(data, source_format)
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let image = match resize.and_then(|r| fit_inside(original.dimensions(), r)) {
            Some((width, height)) => {
                debug!(
                    "Resizing image from {:?} to {}x{}",
                    original.dimensions(),
                    width,
                    height
                );
                original.resize_exact(width, height, FilterType::Lanczos3)
            }
            None => original,
        };

        let output = OutputFormat::for_source(source_format);
        let mut quality = quality.min(100);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let encoded = encode(&image, output, quality)?;

            debug!(
                "Compression attempt {}: quality={}, size={} bytes, target={} bytes",
                attempts,
                quality,
                encoded.len(),
                self.target_size
            );

            if encoded.len() <= self.target_size
                || quality <= MIN_IMAGE_QUALITY
                || !output.honours_quality()
            {
                return Ok(CompressedImage {
                    data: encoded,
                    mime_type: output.mime_type(),
                    quality,
                    attempts,
                });
            }

            quality = quality.saturating_sub(QUALITY_STEP).max(MIN_IMAGE_QUALITY);
        }
    }
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self::new(IMAGE_TARGET_SIZE)
    }
}

/// Dimensions that fit `(width, height)` inside the resize box without
/// enlarging. `None` when the image already fits.
pub fn fit_inside((width, height): (u32, u32), resize: ResizeOptions) -> Option<(u32, u32)> {
    let scale_for = |limit: Option<u32>, actual: u32| {
        limit
            .filter(|l| *l > 0)
            .map(|l| l as f64 / actual.max(1) as f64)
            .unwrap_or(f64::INFINITY)
    };

    let scale = scale_for(resize.width, width).min(scale_for(resize.height, height));
    if scale >= 1.0 {
        return None;
    }

    let scaled = |actual: u32| ((actual as f64 * scale).round() as u32).max(1);
    Some((scaled(width), scaled(height)))
}

fn encode(
    image: &DynamicImage,
    output: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, CompressionError> {
    match output {
        OutputFormat::ProgressiveJpeg => encode_progressive_jpeg(image, quality),
        OutputFormat::Png => encode_png(image),
        OutputFormat::WebP => encode_webp(image, quality),
    }
}

/// JPEG has no alpha channel; transparent pixels are flattened
fn encode_progressive_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
    let rgb = image.to_rgb8();
    let too_large = || CompressionError::Encode("image dimensions exceed JPEG limits".to_string());
    let width = u16::try_from(rgb.width()).map_err(|_| too_large())?;
    let height = u16::try_from(rgb.height()).map_err(|_| too_large())?;

    let mut buffer = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buffer, quality.clamp(1, 100));
    encoder.set_progressive(true);
    encoder
        .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;

    Ok(buffer)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CompressionError> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilterType::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;

    Ok(buffer)
}

fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
    // libwebp only takes 8-bit RGB/RGBA
    let normalized = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let encoder = webp::Encoder::from_image(&normalized)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;

    Ok(encoder.encode(quality as f32).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Deterministic high-entropy image that compresses poorly
    fn noise_image(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x1234_5678;
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xFF) as u8
            };
            Rgb([next(), next(), next()])
        })
    }

    fn encode_source(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    fn is_progressive_jpeg(data: &[u8]) -> bool {
        // SOF2 marker
        data.starts_with(&[0xFF, 0xD8]) && data.windows(2).any(|w| w == [0xFF, 0xC2])
    }

    #[test]
    fn test_fit_inside_never_enlarges() {
        let resize = ResizeOptions {
            width: Some(100),
            height: None,
        };
        assert_eq!(fit_inside((50, 50), resize), None);
    }

    #[test]
    fn test_fit_inside_preserves_aspect_ratio() {
        let width_only = ResizeOptions {
            width: Some(100),
            height: None,
        };
        assert_eq!(fit_inside((200, 100), width_only), Some((100, 50)));

        let both = ResizeOptions {
            width: Some(100),
            height: Some(100),
        };
        assert_eq!(fit_inside((400, 200), both), Some((100, 50)));
        assert_eq!(fit_inside((200, 400), both), Some((50, 100)));

        let zero = ResizeOptions {
            width: Some(0),
            height: None,
        };
        assert_eq!(fit_inside((400, 200), zero), None);
    }

    #[test]
    fn test_resize_does_not_enlarge_small_image() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(50, 50)),
            ImageFormat::Png,
        );
        let resize = ResizeOptions {
            width: Some(100),
            height: None,
        };

        let compressed = ImageCompressor::default()
            .compress_blocking(&source, 80, Some(resize))
            .unwrap();

        let decoded = image::load_from_memory(&compressed.data).unwrap();
        assert!(decoded.width() <= 50);
        assert!(decoded.height() <= 50);
    }

    #[test]
    fn test_resize_shrinks_to_box() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(240, 120)),
            ImageFormat::Jpeg,
        );
        let resize = ResizeOptions {
            width: Some(120),
            height: None,
        };

        let compressed = ImageCompressor::default()
            .compress_blocking(&source, 80, Some(resize))
            .unwrap();

        let decoded = image::load_from_memory(&compressed.data).unwrap();
        assert_eq!(decoded.dimensions(), (120, 60));
    }

    #[test]
    fn test_jpeg_is_reencoded_progressive() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(64, 64)),
            ImageFormat::Jpeg,
        );

        let compressed = ImageCompressor::default()
            .compress_blocking(&source, 80, None)
            .unwrap();

        assert_eq!(compressed.mime_type, "image/jpeg");
        assert_eq!(compressed.attempts, 1);
        assert!(is_progressive_jpeg(&compressed.data));
    }

    #[test]
    fn test_quality_steps_down_to_floor() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(64, 64)),
            ImageFormat::Jpeg,
        );

        // A one-byte budget is never met, so every step is taken
        let compressed = ImageCompressor::new(1)
            .compress_blocking(&source, 80, None)
            .unwrap();

        assert_eq!(compressed.quality, 20);
        assert_eq!(compressed.attempts, 7); // 80, 70, 60, 50, 40, 30, 20
    }

    #[test]
    fn test_quality_below_floor_encodes_once() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(32, 32)),
            ImageFormat::Jpeg,
        );

        let compressed = ImageCompressor::new(1)
            .compress_blocking(&source, 10, None)
            .unwrap();

        assert_eq!(compressed.quality, 10);
        assert_eq!(compressed.attempts, 1);
    }

    #[test]
    fn test_oversized_jpeg_converges() {
        let jpeg_source = encode_source(
            DynamicImage::ImageRgb8(noise_image(768, 768)),
            ImageFormat::Jpeg,
        );
        let compressed = ImageCompressor::default()
            .compress_blocking(&jpeg_source, 100, None)
            .unwrap();

        assert!(compressed.data.len() <= IMAGE_TARGET_SIZE || compressed.quality == 20);
        assert!(compressed.attempts <= 9); // 100 down to 20 in steps of 10
    }

    #[test]
    fn test_png_stays_png_with_single_attempt() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(64, 64)),
            ImageFormat::Png,
        );

        let compressed = ImageCompressor::new(1)
            .compress_blocking(&source, 80, None)
            .unwrap();

        assert_eq!(compressed.mime_type, "image/png");
        assert_eq!(compressed.attempts, 1);
        assert_eq!(
            image::guess_format(&compressed.data).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_webp_stays_webp() {
        let source = noise_image(64, 64);
        let webp_source = webp::Encoder::from_rgb(source.as_raw(), 64, 64)
            .encode(90.0)
            .to_vec();

        let compressed = ImageCompressor::default()
            .compress_blocking(&webp_source, 60, None)
            .unwrap();

        assert_eq!(compressed.mime_type, "image/webp");
        assert_eq!(&compressed.data[0..4], b"RIFF");
        assert_eq!(&compressed.data[8..12], b"WEBP");
    }

    #[test]
    fn test_gif_is_normalized_to_jpeg() {
        let gif = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 128]));
        let source = encode_source(DynamicImage::ImageRgba8(gif), ImageFormat::Gif);

        let compressed = ImageCompressor::default()
            .compress_blocking(&source, 80, None)
            .unwrap();

        assert_eq!(compressed.mime_type, "image/jpeg");
        assert!(is_progressive_jpeg(&compressed.data));
    }

    #[test]
    fn test_corrupt_image_is_an_error() {
        let mut corrupt = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        corrupt.extend_from_slice(&[0xAB; 64]);

        let result = ImageCompressor::default().compress_blocking(&corrupt, 80, None);

        assert!(matches!(result, Err(CompressionError::Decode(_))));
    }

    #[tokio::test]
    async fn test_compress_runs_on_blocking_pool() {
        let source = encode_source(
            DynamicImage::ImageRgb8(noise_image(32, 32)),
            ImageFormat::Jpeg,
        );

        let compressed = ImageCompressor::default()
            .compress(&source, 80, None)
            .await
            .unwrap();

        assert!(is_progressive_jpeg(&compressed.data));
    }
}
