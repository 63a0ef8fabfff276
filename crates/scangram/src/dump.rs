//! Debug rasters of the intermediate pipeline stages.
//!
//! Writes, into one directory:
//! - `working.png`: the final working image the detectors ran on;
//! - `contours.png`: traced contours on black;
//! - `candidates.png`: raw candidates (red) and survivors (green) over
//!   the source, the winner in blue;
//! - `segments.png`: line segments seen by the line-coherence scorer;
//! - `rectified.png`: the extracted document, when one was found.

use std::path::Path;

use image::{ImageError, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use scangram_pipeline::{Point, StagedResult};

const RED: Rgb<u8> = Rgb([220, 40, 40]);
const GREEN: Rgb<u8> = Rgb([40, 200, 60]);
const BLUE: Rgb<u8> = Rgb([40, 90, 240]);
const YELLOW: Rgb<u8> = Rgb([240, 220, 30]);
const GRAY: Rgb<u8> = Rgb([170, 170, 170]);

/// Write every debug raster for `staged` into `dir`, creating it if
/// needed. Overlays are drawn on the source image the run decoded.
pub fn write_all(dir: &Path, staged: &StagedResult) -> Result<(), ImageError> {
    std::fs::create_dir_all(dir)?;

    staged.working.save(dir.join("working.png"))?;

    let mut contours = RgbImage::new(staged.dimensions.width, staged.dimensions.height);
    for contour in &staged.contours {
        draw_ring(&mut contours, contour.points(), GRAY);
    }
    contours.save(dir.join("contours.png"))?;

    let mut candidates = staged.source.clone();
    for candidate in &staged.candidates {
        draw_ring(&mut candidates, candidate.polygon.points(), RED);
    }
    for survivor in &staged.survivors {
        draw_ring(&mut candidates, survivor.polygon.points(), GREEN);
    }
    if let Some(ref detection) = staged.detection {
        draw_ring(&mut candidates, &detection.corners, BLUE);
    }
    candidates.save(dir.join("candidates.png"))?;

    let mut segments = staged.source.clone();
    for segment in &staged.segments {
        draw_segment(&mut segments, segment.start, segment.end, YELLOW);
    }
    segments.save(dir.join("segments.png"))?;

    if let Some(ref rectified) = staged.rectified {
        rectified.save(dir.join("rectified.png"))?;
    }
    Ok(())
}

/// Draw a closed polygon outline.
fn draw_ring(canvas: &mut RgbImage, ring: &[Point], color: Rgb<u8>) {
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        draw_segment(canvas, a, b, color);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_segment(canvas: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>) {
    draw_line_segment_mut(
        canvas,
        (a.x as f32, a.y as f32),
        (b.x as f32, b.y as f32),
        color,
    );
}
