//! Corner ordering and perspective rectification of the winning
//! quadrilateral.
//!
//! The extractor always reads the full-resolution source image, never the
//! downscaled working image, so the crop keeps every pixel the camera
//! captured.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, warn};

use crate::geometry;
use crate::types::{PipelineError, Point};

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y`, bottom-right the largest; top-right
/// has the largest `x - y`, bottom-left the smallest. On ties the earliest
/// point wins. The heuristic assumes the document is rotated by less than
/// about 45 degrees; beyond that two roles can fall on the same point
/// (see [`has_distinct_corners`]).
///
/// Returns `None` unless exactly four points are given.
#[must_use]
pub fn order_corners(points: &[Point]) -> Option<[Point; 4]> {
    let [first, ..] = points else {
        return None;
    };
    if points.len() != 4 {
        return None;
    }

    let pick = |key: fn(&Point) -> f64, better: fn(f64, f64) -> bool| {
        points
            .iter()
            .skip(1)
            .fold(*first, |best, p| if better(key(p), key(&best)) { *p } else { best })
    };
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.x - p.y;
    let less = |a: f64, b: f64| a < b;
    let greater = |a: f64, b: f64| a > b;

    Some([
        pick(sum, less),
        pick(diff, greater),
        pick(sum, greater),
        pick(diff, less),
    ])
}

/// Whether the four ordered corners are four different points.
#[must_use]
pub fn has_distinct_corners(corners: &[Point; 4]) -> bool {
    corners
        .iter()
        .enumerate()
        .all(|(i, a)| corners[i + 1..].iter().all(|b| a != b))
}

/// Perspective-rectify the region bounded by `corners` (ordered TL, TR,
/// BR, BL) into an upright image as large as the corners' axis-aligned
/// bounding box.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateQuad`] if the corners do not define
/// a projective transform or span no area.
pub fn rectify(source: &RgbImage, corners: &[Point; 4]) -> Result<RgbImage, PipelineError> {
    let (lo, hi) = geometry::bounding_box(corners).ok_or(PipelineError::DegenerateQuad)?;
    let width = canvas_extent(hi.x - lo.x).ok_or(PipelineError::DegenerateQuad)?;
    let height = canvas_extent(hi.y - lo.y).ok_or(PipelineError::DegenerateQuad)?;

    #[allow(clippy::cast_possible_truncation)]
    let from = corners.map(|p| (p.x as f32, p.y as f32));
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (width as f32, height as f32);
    let to = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let Some(projection) = Projection::from_control_points(from, to) else {
        warn!(?corners, "corners do not define a perspective transform");
        return Err(PipelineError::DegenerateQuad);
    };

    let mut output = RgbImage::new(width, height);
    warp_into(
        source,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut output,
    );
    debug!(width, height, "document rectified");
    Ok(output)
}

/// Rounded canvas side for a bounding-box extent, or `None` when the
/// extent is empty or not a finite pixel count.
fn canvas_extent(extent: f64) -> Option<u32> {
    let rounded = extent.round();
    if !(rounded >= 1.0 && rounded <= f64::from(u32::MAX)) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixels = rounded as u32;
    Some(pixels)
}
