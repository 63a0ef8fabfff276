//! Contour tracing on the binary edge map.
//!
//! Suzuki-Abe border following via [`imageproc::contours::find_contours`]
//! returns every outer border and every hole border, so a closed Canny
//! ring yields two nested contours. Both are kept: the outer one tends to
//! hug the page edge from outside and the hole one from inside, and the
//! scoring chain decides between them.
//!
//! Contours are traced once per run and shared by every detector.

use image::GrayImage;

use crate::types::{Point, Polyline};

/// Contours with fewer points cannot simplify to a polygon.
const MIN_CONTOUR_POINTS: usize = 3;

/// Trace all borders in a binary edge map (non-zero = foreground).
///
/// Converts `imageproc` contour points (integer grid coordinates) into
/// floating-point [`Point`]s. Contours with fewer than three points are
/// dropped.
#[must_use = "returns the traced contours"]
pub fn trace_contours(edges: &GrayImage) -> Vec<Polyline> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.points.len() >= MIN_CONTOUR_POINTS)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Polyline::new(points)
        })
        .collect()
}
