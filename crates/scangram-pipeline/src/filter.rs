//! Raster filters used to turn a photograph into a clean binary map of
//! document boundaries before Canny runs.
//!
//! The edge-map stage chains them: an edge-preserving bilateral filter
//! removes texture inside the page, an adaptive Gaussian threshold turns
//! the page into a solid region regardless of uneven lighting, a median
//! filter removes speckle, and a constant border keeps documents that
//! touch the frame closed.

use image::{GrayImage, Luma};
use imageproc::filter::bilateral::{self, GaussianEuclideanColorDistance};

/// Edge-preserving smoothing.
///
/// Each output pixel is the average of its neighbours within a square
/// window of `diameter` pixels, weighted by a Gaussian of the spatial
/// distance (`sigma_space`) and a Gaussian of the intensity difference
/// (`sigma_color`). Pixels across a strong edge contribute almost nothing,
/// so edges stay sharp while flat regions are smoothed. Samples outside
/// the image repeat the nearest edge pixel.
///
/// The window radius is `diameter / 2`, capped at 255.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let radius = u8::try_from(diameter / 2).unwrap_or(u8::MAX);
    bilateral::bilateral_filter(
        image,
        radius,
        sigma_space,
        GaussianEuclideanColorDistance::new(sigma_color),
    )
}

/// Adaptive Gaussian threshold (binary).
///
/// A pixel becomes 255 when it is brighter than the Gaussian-weighted
/// mean of its `block_size` × `block_size` neighbourhood minus `c`, and
/// 0 otherwise. The Gaussian sigma is derived from the block size as
/// `0.3 * ((block_size - 1) / 2 - 1) + 0.8`.
///
/// `block_size` must be odd and at least 3.
#[must_use = "returns the thresholded image"]
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let sigma = block_sigma(block_size);
    let mean = imageproc::filter::gaussian_blur_f32(image, sigma);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = f64::from(image.get_pixel(x, y).0[0]);
        let threshold = f64::from(mean.get_pixel(x, y).0[0]) - c;
        if value > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Gaussian sigma matching a square block of `block_size` pixels.
fn block_sigma(block_size: u32) -> f32 {
    let half = f64::from(block_size.max(3) - 1) * 0.5;
    #[allow(clippy::cast_possible_truncation)]
    let sigma = 0.3_f64.mul_add(half - 1.0, 0.8) as f32;
    sigma
}

/// Median filter with a square `kernel` × `kernel` window.
///
/// `kernel` must be odd; the window radius is `kernel / 2`.
#[must_use = "returns the filtered image"]
pub fn median(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    imageproc::filter::median_filter(image, radius, radius)
}

/// Surround `image` with a constant black border of `border` pixels on
/// every side.
///
/// Returns `None` if the padded dimensions overflow `u32`.
#[must_use = "returns the padded image"]
pub fn pad_border(image: &GrayImage, border: u32) -> Option<GrayImage> {
    let extra = border.checked_mul(2)?;
    let width = image.width().checked_add(extra)?;
    let height = image.height().checked_add(extra)?;

    let mut padded = GrayImage::new(width, height);
    image::imageops::replace(&mut padded, image, i64::from(border), i64::from(border));
    Some(padded)
}
