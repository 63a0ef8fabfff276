//! Downscaling the working image to a bounded height.
//!
//! Photographs from phone cameras are far larger than detection needs.
//! Every later stage (bilateral filter, adaptive threshold, Canny,
//! contour tracing, Hough voting) scales with the pixel count, so the
//! working image is shrunk first while the color source image keeps its
//! full resolution for extraction.
//!
//! Images already at or below the target height are returned unchanged.

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Resampling filter used when downscaling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Downscale `image` so its height is at most `max_height`, preserving
/// the aspect ratio.
///
/// Returns the (possibly unchanged) image and, when a resize happened,
/// the applied ratio `max_height / original_height`. Points in the
/// resized image map back to the original by dividing by that ratio.
#[must_use = "returns the resized image and the applied ratio"]
pub fn resize_to_height(
    image: GrayImage,
    max_height: u32,
    filter: ResizeFilter,
) -> (GrayImage, Option<f64>) {
    let (w, h) = image.dimensions();
    if h <= max_height || max_height == 0 {
        return (image, None);
    }

    let ratio = f64::from(max_height) / f64::from(h);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_width = (f64::from(w) * ratio).round().max(1.0) as u32;

    let resized = image::imageops::resize(&image, new_width, max_height, filter.to_image_filter());
    (resized, Some(ratio))
}
