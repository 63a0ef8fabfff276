//! Shared types for the scangram document pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// decoded source image without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of points. Candidate polygons use it as a closed ring
/// without repeating the first point at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Returns a mutable slice of all points, for in-place coordinate
    /// correction.
    pub fn points_mut(&mut self) -> &mut [Point] {
        &mut self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// `width * height` as a float, for area baselines.
    #[must_use]
    pub fn area(self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

/// A document boundary hypothesis.
///
/// Created by a contour detector with `score` set to the detector's base
/// weight. Coordinate correction and the scoring chain mutate it in
/// place; filters drop it. It is never duplicated after detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Polygon vertices, in working-image space until corrected and in
    /// source-image space afterwards.
    pub polygon: Polyline,
    /// Accumulated score. Higher is better.
    pub score: f64,
    /// Index into `PipelineConfig::detectors` of the detector that
    /// produced this candidate.
    pub detector: usize,
}

impl Candidate {
    /// Create a candidate with its initial score.
    #[must_use]
    pub const fn new(polygon: Polyline, score: f64, detector: usize) -> Self {
        Self {
            polygon,
            score,
            detector,
        }
    }
}

/// The winning quadrilateral in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Corners ordered top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point; 4],
    /// Final score of the winning candidate.
    pub score: f64,
    /// Index of the detector that produced the winner.
    pub detector: usize,
}

/// Errors that can occur during pipeline processing.
///
/// "No document found" is not an error; entry points report it as
/// `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Decoding or buffer allocation exceeded a configured limit.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The quadrilateral handed to `extract::rectify` does not define a
    /// perspective transform.
    #[error("detected quadrilateral is degenerate")]
    DegenerateQuad,

    /// Failed to encode the rectified image.
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),

    /// Reading the input stream failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
