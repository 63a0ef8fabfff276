//! Canny edge detection with Otsu-derived thresholds.
//!
//! Wraps [`imageproc::edges::canny`]. Returns a binary image where white
//! pixels (255) are edges and black pixels (0) are background.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// The Otsu estimate of a nearly uniform image can be zero, and a
/// threshold of zero turns every pixel with any gradient into an edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Canny with thresholds scaled from the image's Otsu level.
///
/// Returns the edge map together with the Otsu estimate it was derived
/// from.
#[must_use = "returns the binary edge map and the Otsu estimate"]
pub fn otsu_canny(image: &GrayImage, low_factor: f32, high_factor: f32) -> (GrayImage, u8) {
    let level = imageproc::contrast::otsu_level(image);
    let estimate = f32::from(level);
    let edges = canny(image, estimate * low_factor, estimate * high_factor);
    (edges, level)
}

/// Number of edge (non-zero) pixels in a binary map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> usize {
    edges.pixels().filter(|p| p.0[0] > 0).count()
}
