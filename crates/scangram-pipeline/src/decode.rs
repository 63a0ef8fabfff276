//! Image decoding, grayscale conversion and JPEG encoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! color source image plus a single-channel working image. Decoding is
//! bounded by [`DecodeLimits`] so oversized inputs are rejected with a
//! typed error before any large buffer is allocated.
//!
//! This is the first step in the pipeline: raw bytes in, images out.
//! [`encode_jpeg`] is the last one.

use std::io::Cursor;

use image::{GrayImage, ImageError, RgbImage};
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Upper bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum accepted image width in pixels.
    pub max_width: u32,
    /// Maximum accepted image height in pixels.
    pub max_height: u32,
    /// Maximum number of bytes the decoder may allocate.
    pub max_alloc_bytes: u64,
}

impl DecodeLimits {
    /// Default maximum width in pixels.
    pub const DEFAULT_MAX_WIDTH: u32 = 16_384;
    /// Default maximum height in pixels.
    pub const DEFAULT_MAX_HEIGHT: u32 = 16_384;
    /// Default decoder allocation ceiling (512 MiB).
    pub const DEFAULT_MAX_ALLOC_BYTES: u64 = 512 * 1024 * 1024;

    fn to_image_limits(self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc_bytes);
        limits
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: Self::DEFAULT_MAX_WIDTH,
            max_height: Self::DEFAULT_MAX_HEIGHT,
            max_alloc_bytes: Self::DEFAULT_MAX_ALLOC_BYTES,
        }
    }
}

/// Decode raw image bytes into an RGB source image.
///
/// The format is sniffed from the content, not from any file name.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ResourceLimit`] if the image exceeds `limits`, and
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode(bytes: &[u8], limits: &DecodeLimits) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits.to_image_limits());

    let decoded = reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => PipelineError::ResourceLimit(limit.to_string()),
        other => PipelineError::ImageDecode(other),
    })?;
    Ok(decoded.into_rgb8())
}

/// Luminance of the source image, used as the initial working image.
#[must_use = "returns the grayscale working image"]
pub fn to_grayscale(source: &RgbImage) -> GrayImage {
    image::imageops::grayscale(source)
}

/// Encode an RGB image as baseline JPEG at the given quality (1-100).
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the encoder rejects the image.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )
    .map_err(PipelineError::Encode)?;
    Ok(buf)
}
