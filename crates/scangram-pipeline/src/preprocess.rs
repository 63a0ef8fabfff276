//! Preprocessing chain: the ordered stages that turn the grayscale
//! working image into a binary edge map, and the corrections that map
//! coordinates found in that edge map back into source-image space.
//!
//! # Strategy pattern
//!
//! Stages are a closed [`PreprocessorKind`] enum implementing the
//! [`Preprocessor`] trait, so the configured list is plain data that can
//! be serialized, validated and shared across threads. A stage that needs
//! to remember something for its correction (the resize ratio) returns a
//! [`StageState`]; the chain keeps one optional state per stage and hands
//! it back to the same stage during correction.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edge;
use crate::filter;
use crate::resize::{self, ResizeFilter};
use crate::types::{PipelineError, Point};

/// Parameters of the edge-map stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMapParams {
    /// Bilateral filter window diameter in pixels.
    pub bilateral_diameter: u32,
    /// Bilateral filter intensity sigma.
    pub sigma_color: f32,
    /// Bilateral filter spatial sigma.
    pub sigma_space: f32,
    /// Adaptive threshold block size in pixels (odd, at least 3).
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean by the adaptive threshold.
    pub adaptive_c: f64,
    /// Median filter kernel size in pixels (odd).
    pub median_kernel: u32,
    /// Width of the black border added on every side, in pixels.
    pub border: u32,
    /// Canny low threshold as a multiple of the Otsu estimate.
    pub canny_low_factor: f32,
    /// Canny high threshold as a multiple of the Otsu estimate.
    pub canny_high_factor: f32,
}

impl EdgeMapParams {
    /// Default bilateral window diameter.
    pub const DEFAULT_BILATERAL_DIAMETER: u32 = 9;
    /// Largest bilateral window diameter (radius 255).
    pub const MAX_BILATERAL_DIAMETER: u32 = 511;
    /// Default bilateral intensity sigma.
    pub const DEFAULT_SIGMA_COLOR: f32 = 75.0;
    /// Default bilateral spatial sigma.
    pub const DEFAULT_SIGMA_SPACE: f32 = 75.0;
    /// Default adaptive threshold block size.
    pub const DEFAULT_ADAPTIVE_BLOCK_SIZE: u32 = 115;
    /// Default adaptive threshold constant.
    pub const DEFAULT_ADAPTIVE_C: f64 = 4.0;
    /// Default median kernel size.
    pub const DEFAULT_MEDIAN_KERNEL: u32 = 11;
    /// Default border width.
    pub const DEFAULT_BORDER: u32 = 5;
    /// Default Canny low factor.
    pub const DEFAULT_CANNY_LOW_FACTOR: f32 = 1.0;
    /// Default Canny high factor.
    pub const DEFAULT_CANNY_HIGH_FACTOR: f32 = 2.0;

    /// Check parameter invariants, returning a description of the first
    /// violation.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=Self::MAX_BILATERAL_DIAMETER).contains(&self.bilateral_diameter) {
            return Err(format!(
                "bilateral_diameter must be in 1..={}, got {}",
                Self::MAX_BILATERAL_DIAMETER,
                self.bilateral_diameter
            ));
        }
        if !(self.sigma_color > 0.0 && self.sigma_color.is_finite())
            || !(self.sigma_space > 0.0 && self.sigma_space.is_finite())
        {
            return Err("bilateral sigmas must be positive and finite".to_owned());
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(format!(
                "adaptive_block_size must be odd and at least 3, got {}",
                self.adaptive_block_size
            ));
        }
        if !self.adaptive_c.is_finite() {
            return Err("adaptive_c must be finite".to_owned());
        }
        if self.median_kernel % 2 == 0 {
            return Err(format!(
                "median_kernel must be odd, got {}",
                self.median_kernel
            ));
        }
        if !(self.canny_low_factor.is_finite() && self.canny_high_factor.is_finite())
            || self.canny_low_factor < 0.0
            || self.canny_high_factor < 0.0
        {
            return Err("canny factors must be finite and non-negative".to_owned());
        }
        Ok(())
    }
}

impl Default for EdgeMapParams {
    fn default() -> Self {
        Self {
            bilateral_diameter: Self::DEFAULT_BILATERAL_DIAMETER,
            sigma_color: Self::DEFAULT_SIGMA_COLOR,
            sigma_space: Self::DEFAULT_SIGMA_SPACE,
            adaptive_block_size: Self::DEFAULT_ADAPTIVE_BLOCK_SIZE,
            adaptive_c: Self::DEFAULT_ADAPTIVE_C,
            median_kernel: Self::DEFAULT_MEDIAN_KERNEL,
            border: Self::DEFAULT_BORDER,
            canny_low_factor: Self::DEFAULT_CANNY_LOW_FACTOR,
            canny_high_factor: Self::DEFAULT_CANNY_HIGH_FACTOR,
        }
    }
}

/// Selects a preprocessing stage and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessorKind {
    /// Downscale so the working image is at most `max_height` tall.
    Resize {
        /// Target height in pixels.
        #[serde(default = "default_max_height")]
        max_height: u32,
        /// Resampling filter.
        #[serde(default)]
        filter: ResizeFilter,
    },
    /// Bilateral filter, adaptive threshold, median, border pad, Canny.
    EdgeMap(EdgeMapParams),
}

const fn default_max_height() -> u32 {
    PreprocessorKind::DEFAULT_MAX_HEIGHT
}

impl PreprocessorKind {
    /// Default resize target height.
    pub const DEFAULT_MAX_HEIGHT: u32 = 1600;

    /// The default two-stage chain: resize, then edge map.
    #[must_use]
    pub fn default_chain() -> Vec<Self> {
        vec![
            Self::Resize {
                max_height: Self::DEFAULT_MAX_HEIGHT,
                filter: ResizeFilter::default(),
            },
            Self::EdgeMap(EdgeMapParams::default()),
        ]
    }

    /// Short stage name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Resize { .. } => "resize",
            Self::EdgeMap(_) => "edge_map",
        }
    }
}

/// Per-stage correction payload, produced by a stage when it runs and
/// consumed only by that stage's correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StageState {
    /// The working image was scaled by `ratio`.
    Resized {
        /// `max_height / original_height`.
        ratio: f64,
    },
}

/// A single preprocessing stage.
pub trait Preprocessor {
    /// Transform the working image, taking ownership of it and returning
    /// the buffer the chain continues with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceLimit`] if an intermediate buffer
    /// cannot be sized.
    fn apply(&self, working: GrayImage) -> Result<(GrayImage, Option<StageState>), PipelineError>;

    /// Map points from this stage's output space back into its input
    /// space, in place.
    fn correct(&self, points: &mut [Point], state: Option<&StageState>);
}

impl Preprocessor for PreprocessorKind {
    fn apply(&self, working: GrayImage) -> Result<(GrayImage, Option<StageState>), PipelineError> {
        match self {
            Self::Resize { max_height, filter } => {
                let (resized, ratio) = resize::resize_to_height(working, *max_height, *filter);
                Ok((resized, ratio.map(|ratio| StageState::Resized { ratio })))
            }
            Self::EdgeMap(params) => Ok((edge_map(&working, params)?, None)),
        }
    }

    fn correct(&self, points: &mut [Point], state: Option<&StageState>) {
        match (self, state) {
            (Self::Resize { .. }, Some(StageState::Resized { ratio })) => {
                for p in points {
                    p.x /= ratio;
                    p.y /= ratio;
                }
            }
            (Self::Resize { .. }, None) => {}
            (Self::EdgeMap(params), _) => {
                let border = f64::from(params.border);
                for p in points {
                    p.x -= border;
                    p.y -= border;
                }
            }
        }
    }
}

fn edge_map(image: &GrayImage, params: &EdgeMapParams) -> Result<GrayImage, PipelineError> {
    let smoothed = filter::bilateral_filter(
        image,
        params.bilateral_diameter,
        params.sigma_color,
        params.sigma_space,
    );
    let binary =
        filter::adaptive_threshold_gaussian(&smoothed, params.adaptive_block_size, params.adaptive_c);
    drop(smoothed);
    let cleaned = filter::median(&binary, params.median_kernel);
    drop(binary);
    let padded = filter::pad_border(&cleaned, params.border).ok_or_else(|| {
        PipelineError::ResourceLimit(format!(
            "{}x{} image with a {} px border overflows",
            cleaned.width(),
            cleaned.height(),
            params.border
        ))
    })?;
    let (edges, otsu) = edge::otsu_canny(
        &padded,
        params.canny_low_factor,
        params.canny_high_factor,
    );
    debug!(
        otsu,
        edge_pixels = edge::count_edge_pixels(&edges),
        width = edges.width(),
        height = edges.height(),
        "edge map built"
    );
    Ok(edges)
}

/// The per-stage states recorded by one run of the chain, paired with the
/// stages that produced them.
#[derive(Debug, Clone)]
pub struct Corrections<'a> {
    stages: &'a [PreprocessorKind],
    states: Vec<Option<StageState>>,
}

impl<'a> Corrections<'a> {
    /// Pair stages with their recorded states.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the two lists differ
    /// in length.
    pub fn new(
        stages: &'a [PreprocessorKind],
        states: Vec<Option<StageState>>,
    ) -> Result<Self, PipelineError> {
        if stages.len() != states.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "{} stages but {} stage states",
                stages.len(),
                states.len()
            )));
        }
        Ok(Self { stages, states })
    }

    /// Map points from the final working image back to source-image space,
    /// applying every stage's correction once, in the order the stages ran.
    pub fn apply(&self, points: &mut [Point]) {
        for (stage, state) in self.stages.iter().zip(&self.states) {
            stage.correct(points, state.as_ref());
        }
    }

    /// The recorded per-stage states.
    #[must_use]
    pub fn states(&self) -> &[Option<StageState>] {
        &self.states
    }
}

/// Run every stage in order on `working`.
///
/// # Errors
///
/// Propagates the first stage error. Buffers owned by the chain are
/// dropped before the error is returned.
pub fn run_chain(
    stages: &[PreprocessorKind],
    mut working: GrayImage,
) -> Result<(GrayImage, Corrections<'_>), PipelineError> {
    let mut states = Vec::with_capacity(stages.len());
    for stage in stages {
        let (next, state) = stage.apply(working)?;
        debug!(
            stage = stage.name(),
            width = next.width(),
            height = next.height(),
            ?state,
            "preprocessing stage done"
        );
        working = next;
        states.push(state);
    }
    Ok((working, Corrections::new(stages, states)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn resize_correction_round_trip() {
        let stages = [PreprocessorKind::Resize {
            max_height: 200,
            filter: ResizeFilter::Triangle,
        }];
        let (resized, corrections) = run_chain(&stages, GrayImage::new(300, 800)).unwrap();
        assert_eq!(resized.height(), 200);
        assert_eq!(corrections.states(), &[Some(StageState::Resized { ratio: 0.25 })]);

        let original = [Point::new(12.5, 700.0), Point::new(299.0, 0.0)];
        let mut points = original.map(|p| Point::new(p.x * 0.25, p.y * 0.25));
        corrections.apply(&mut points);
        for (got, want) in points.iter().zip(&original) {
            assert!(close(*got, *want), "{got:?} != {want:?}");
        }
    }

    #[test]
    fn resize_without_state_leaves_points() {
        let stage = PreprocessorKind::Resize {
            max_height: 200,
            filter: ResizeFilter::Triangle,
        };
        let mut points = [Point::new(3.0, 4.0)];
        stage.correct(&mut points, None);
        assert_eq!(points[0], Point::new(3.0, 4.0));
    }

    #[test]
    fn edge_map_correction_subtracts_border() {
        let stage = PreprocessorKind::EdgeMap(EdgeMapParams::default());
        let mut points = [Point::new(5.0, 15.0)];
        stage.correct(&mut points, None);
        assert_eq!(points[0], Point::new(0.0, 10.0));
    }

    #[test]
    fn corrections_apply_in_stage_order() {
        let stages = [
            PreprocessorKind::Resize {
                max_height: 100,
                filter: ResizeFilter::Triangle,
            },
            PreprocessorKind::EdgeMap(EdgeMapParams::default()),
        ];
        let corrections =
            Corrections::new(&stages, vec![Some(StageState::Resized { ratio: 0.5 }), None]).unwrap();
        let mut points = [Point::new(25.0, 45.0)];
        corrections.apply(&mut points);
        // Divide by the ratio first, then subtract the border.
        assert!(close(points[0], Point::new(45.0, 85.0)));
    }

    #[test]
    fn mismatched_states_are_rejected() {
        let stages = PreprocessorKind::default_chain();
        let result = Corrections::new(&stages, vec![None]);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn edge_map_pads_and_finds_rectangle_boundary() {
        let img = GrayImage::from_fn(160, 120, |x, y| {
            if (50..110).contains(&x) && (40..80).contains(&y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        });
        let params = EdgeMapParams {
            adaptive_block_size: 31,
            median_kernel: 5,
            ..EdgeMapParams::default()
        };
        let (edges, state) = PreprocessorKind::EdgeMap(params).apply(img).unwrap();
        assert!(state.is_none());
        assert_eq!(edges.dimensions(), (170, 130));
        assert!(edge::count_edge_pixels(&edges) > 0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn default_params_are_valid() {
        assert!(EdgeMapParams::default().validate().is_ok());
    }

    #[test]
    fn even_kernels_are_invalid() {
        let even_block = EdgeMapParams {
            adaptive_block_size: 114,
            ..EdgeMapParams::default()
        };
        assert!(even_block.validate().is_err());
        let even_median = EdgeMapParams {
            median_kernel: 10,
            ..EdgeMapParams::default()
        };
        assert!(even_median.validate().is_err());
    }

    #[test]
    fn bilateral_diameter_is_bounded() {
        for diameter in [0, 512] {
            let params = EdgeMapParams {
                bilateral_diameter: diameter,
                ..EdgeMapParams::default()
            };
            assert!(params.validate().is_err(), "diameter {diameter}");
        }
        let widest = EdgeMapParams {
            bilateral_diameter: EdgeMapParams::MAX_BILATERAL_DIAMETER,
            ..EdgeMapParams::default()
        };
        assert!(widest.validate().is_ok());
    }

    #[test]
    fn stage_kind_json_uses_tag() {
        let json = serde_json::to_string(&PreprocessorKind::default_chain()).unwrap();
        assert!(json.contains("\"kind\":\"resize\""));
        assert!(json.contains("\"kind\":\"edge_map\""));
        let back: Vec<PreprocessorKind> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PreprocessorKind::default_chain());
    }
}
