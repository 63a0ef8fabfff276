//! Progressive probabilistic Hough transform for line segments.
//!
//! Edge pixels vote one at a time into a (rho, theta) accumulator. As soon
//! as a bin collects `vote_threshold` votes, the corresponding line is
//! walked in both directions from the pixel that completed it, bridging
//! gaps of up to `max_line_gap` pixels. Walked pixels are removed from the
//! pending set, and if the walk is at least `min_line_length` long their
//! votes are withdrawn and the segment is emitted.
//!
//! Pixels are visited in a pseudo-random order keyed on their coordinates
//! with SipHash, so results are identical across runs and threads.

use std::f64::consts::PI;
use std::hash::Hasher;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::types::{PipelineError, Point};

/// Accumulator cells above which detection is refused.
const MAX_ACCUMULATOR_CELLS: usize = 64 * 1024 * 1024;

/// Fixed keys for the visit order.
const VISIT_KEYS: (u64, u64) = (0x7363_616e_6772_616d, 0x686f_7567_6870_7074);

/// Parameters of the probabilistic Hough transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Distance resolution of the accumulator, in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator, in radians.
    pub theta: f64,
    /// Votes a bin needs before its line is walked.
    pub vote_threshold: u32,
    /// Minimum segment extent (along x or y) to be reported, in pixels.
    pub min_line_length: u32,
    /// Maximum run of missing pixels bridged while walking a line.
    pub max_line_gap: u32,
}

impl HoughParams {
    /// Default distance resolution.
    pub const DEFAULT_RHO: f64 = 1.0;
    /// Default angle resolution (one degree).
    pub const DEFAULT_THETA: f64 = PI / 180.0;
    /// Default vote threshold.
    pub const DEFAULT_VOTE_THRESHOLD: u32 = 10;
    /// Default minimum segment length.
    pub const DEFAULT_MIN_LINE_LENGTH: u32 = 100;
    /// Default maximum gap.
    pub const DEFAULT_MAX_LINE_GAP: u32 = 100;

    /// Check parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.rho > 0.0 && self.rho.is_finite()) {
            return Err(format!("hough rho must be positive, got {}", self.rho));
        }
        if !(self.theta > 0.0 && self.theta <= PI) {
            return Err(format!("hough theta must be in (0, pi], got {}", self.theta));
        }
        if self.vote_threshold == 0 {
            return Err("hough vote_threshold must be positive".to_owned());
        }
        Ok(())
    }
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: Self::DEFAULT_RHO,
            theta: Self::DEFAULT_THETA,
            vote_threshold: Self::DEFAULT_VOTE_THRESHOLD,
            min_line_length: Self::DEFAULT_MIN_LINE_LENGTH,
            max_line_gap: Self::DEFAULT_MAX_LINE_GAP,
        }
    }
}

/// A detected straight segment between two edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    /// One end of the segment.
    pub start: Point,
    /// The other end of the segment.
    pub end: Point,
}

impl LineSegment {
    /// Euclidean length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

struct Accumulator {
    num_angle: usize,
    num_rho: usize,
    offset: i64,
    /// Per angle: `(cos, sin)` already divided by rho.
    trig: Vec<(f64, f64)>,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, params: &HoughParams) -> Result<Self, PipelineError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_angle = ((PI / params.theta).round() as usize).max(1);
        let span = (f64::from(width) + f64::from(height)).mul_add(2.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_rho = ((span / params.rho).round() as usize).max(1);

        let cells = num_angle.checked_mul(num_rho).unwrap_or(usize::MAX);
        if cells > MAX_ACCUMULATOR_CELLS {
            return Err(PipelineError::ResourceLimit(format!(
                "hough accumulator of {num_angle}x{num_rho} cells exceeds {MAX_ACCUMULATOR_CELLS}"
            )));
        }

        let trig = (0..num_angle)
            .map(|n| {
                #[allow(clippy::cast_precision_loss)]
                let angle = n as f64 * params.theta;
                (angle.cos() / params.rho, angle.sin() / params.rho)
            })
            .collect();

        Ok(Self {
            num_angle,
            num_rho,
            offset: i64::try_from((num_rho - 1) / 2).unwrap_or(i64::MAX),
            trig,
            votes: vec![0; cells],
        })
    }

    fn cell(&self, angle: usize, x: usize, y: usize) -> usize {
        let (cos_t, sin_t) = self.trig[angle];
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let r = (x as f64).mul_add(cos_t, y as f64 * sin_t).round() as i64 + self.offset;
        let r = usize::try_from(r).unwrap_or(0).min(self.num_rho - 1);
        angle * self.num_rho + r
    }

    /// Add the pixel's votes and return the strongest angle with its count.
    fn vote(&mut self, x: usize, y: usize) -> (usize, i32) {
        let mut best = (0, i32::MIN);
        for angle in 0..self.num_angle {
            let cell = self.cell(angle, x, y);
            self.votes[cell] += 1;
            if self.votes[cell] > best.1 {
                best = (angle, self.votes[cell]);
            }
        }
        best
    }

    fn unvote(&mut self, x: usize, y: usize) {
        for angle in 0..self.num_angle {
            let cell = self.cell(angle, x, y);
            self.votes[cell] -= 1;
        }
    }
}

/// Stepping state for walking a line from a seed pixel.
#[derive(Clone, Copy)]
struct Walk {
    x0: f64,
    y0: f64,
    dx: f64,
    dy: f64,
}

impl Walk {
    /// Walk along the line whose normal has angle `angle`, one pixel per
    /// step along its dominant axis.
    fn new(seed: (usize, usize), angle: f64) -> Self {
        // Direction vector along the line.
        let a = -angle.sin();
        let b = angle.cos();
        let (dx, dy) = if a.abs() > b.abs() {
            (a.signum(), b / a.abs())
        } else {
            (a / b.abs(), b.signum())
        };
        #[allow(clippy::cast_precision_loss)]
        let (x0, y0) = (seed.0 as f64, seed.1 as f64);
        Self { x0, y0, dx, dy }
    }

    /// Pixel at `step` steps in direction `sign` (+1 or -1), or `None`
    /// once outside a `width` x `height` image.
    fn pixel(&self, step: f64, sign: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        let x = (sign * self.dx).mul_add(step, self.x0) + 0.5;
        let y = (sign * self.dy).mul_add(step, self.y0) + 0.5;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (x.floor() as usize, y.floor() as usize);
        (x < width && y < height).then_some((x, y))
    }
}

#[allow(clippy::cast_precision_loss)]
fn pixel_point((x, y): (usize, usize)) -> Point {
    Point::new(x as f64, y as f64)
}

fn visit_key(x: u32, y: u32) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(VISIT_KEYS.0, VISIT_KEYS.1);
    hasher.write_u32(x);
    hasher.write_u32(y);
    hasher.finish()
}

/// Detect line segments among the non-zero pixels of `edges`.
///
/// # Errors
///
/// Returns [`PipelineError::ResourceLimit`] if the accumulator for this
/// image size and resolution would be too large.
pub fn detect_segments(
    edges: &GrayImage,
    params: &HoughParams,
) -> Result<Vec<LineSegment>, PipelineError> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }
    let mut accumulator = Accumulator::new(width, height, params)?;

    let w = width as usize;
    let h = height as usize;
    let mut mask: Vec<bool> = edges.as_raw().iter().map(|&v| v > 0).collect();
    let mut voted = vec![false; mask.len()];

    let mut pending: Vec<(u32, u32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    pending.sort_by_key(|&(x, y)| (visit_key(x, y), y, x));

    let threshold = i32::try_from(params.vote_threshold).unwrap_or(i32::MAX);
    let min_length = params.min_line_length as usize;
    let max_gap = params.max_line_gap;
    let mut segments = Vec::new();

    for (px, py) in pending {
        let seed = (px as usize, py as usize);
        let index = seed.1 * w + seed.0;
        if !mask[index] {
            continue;
        }

        let (best_angle, best_votes) = accumulator.vote(seed.0, seed.1);
        voted[index] = true;
        if best_votes < threshold {
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let walk = Walk::new(seed, best_angle as f64 * params.theta);

        // Find how far the line extends in each direction.
        let mut ends = [seed; 2];
        for (k, sign) in [1.0, -1.0].into_iter().enumerate() {
            let mut gap = 0;
            let mut step = 0.0;
            while let Some((x, y)) = walk.pixel(step, sign, w, h) {
                if mask[y * w + x] {
                    gap = 0;
                    ends[k] = (x, y);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                step += 1.0;
            }
        }

        let good_line = ends[1].0.abs_diff(ends[0].0) >= min_length
            || ends[1].1.abs_diff(ends[0].1) >= min_length;

        // Consume the walked pixels, withdrawing their votes for a good line.
        for (k, sign) in [1.0, -1.0].into_iter().enumerate() {
            let mut step = 0.0;
            while let Some((x, y)) = walk.pixel(step, sign, w, h) {
                let i = y * w + x;
                if mask[i] {
                    if good_line && voted[i] {
                        accumulator.unvote(x, y);
                        voted[i] = false;
                    }
                    mask[i] = false;
                }
                if (x, y) == ends[k] {
                    break;
                }
                step += 1.0;
            }
        }

        if good_line {
            segments.push(LineSegment {
                start: pixel_point(ends[0]),
                end: pixel_point(ends[1]),
            });
        }
    }

    Ok(segments)
}
