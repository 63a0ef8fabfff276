//! Scoring chain: ordered filters and scorers that whittle the candidate
//! set down.
//!
//! Each scorer takes ownership of the candidates and returns the
//! survivors, so a filter can drop any number of them without index
//! bookkeeping and the set can only shrink. Structural filters (vertex
//! count, convexity) only remove; numeric scorers (area, line coherence)
//! assume they run on convex quadrilaterals.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry;
use crate::hough::{self, HoughParams, LineSegment};
use crate::preprocess::Corrections;
use crate::types::{Candidate, Dimensions, PipelineError};

/// Selects a filter or scorer and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultScorerKind {
    /// Drop polygons that do not have exactly four vertices.
    VertexCount,
    /// Drop polygons whose turns are not all in the same direction.
    Convexity,
    /// Drop polygons that are implausibly large or small for a document
    /// and penalise survivors by how little of the image they cover.
    Area {
        /// Pixels subtracted from each image dimension for the upper bound.
        #[serde(default = "default_margin_px")]
        margin_px: u32,
        /// Lower bound as a fraction of the upper bound, in (0, 1].
        #[serde(default = "default_min_fraction")]
        min_fraction: f64,
    },
    /// Reward polygons that enclose many long straight edges relative to
    /// their size.
    LineCoherence {
        /// Segment detection parameters.
        #[serde(default)]
        lines: HoughParams,
        /// Number of best-ranked candidates that receive a bonus.
        #[serde(default = "default_top_k")]
        top_k: usize,
    },
}

const fn default_margin_px() -> u32 {
    ResultScorerKind::DEFAULT_MARGIN_PX
}

const fn default_min_fraction() -> f64 {
    ResultScorerKind::DEFAULT_MIN_FRACTION
}

const fn default_top_k() -> usize {
    ResultScorerKind::DEFAULT_TOP_K
}

impl ResultScorerKind {
    /// Default area margin.
    pub const DEFAULT_MARGIN_PX: u32 = 10;
    /// Default lower area bound fraction.
    pub const DEFAULT_MIN_FRACTION: f64 = 0.25;
    /// Default number of line-coherence bonuses.
    pub const DEFAULT_TOP_K: usize = 5;

    /// The default chain: both structural filters, then area, then line
    /// coherence.
    #[must_use]
    pub fn default_chain() -> Vec<Self> {
        vec![
            Self::VertexCount,
            Self::Convexity,
            Self::Area {
                margin_px: Self::DEFAULT_MARGIN_PX,
                min_fraction: Self::DEFAULT_MIN_FRACTION,
            },
            Self::LineCoherence {
                lines: HoughParams::default(),
                top_k: Self::DEFAULT_TOP_K,
            },
        ]
    }

    /// Short scorer name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::VertexCount => "vertex_count",
            Self::Convexity => "convexity",
            Self::Area { .. } => "area",
            Self::LineCoherence { .. } => "line_coherence",
        }
    }
}

/// What a scorer may read besides the candidates themselves.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    /// The final working image (edge map) detection ran on.
    pub processed: &'a GrayImage,
    /// Dimensions of the decoded source image.
    pub source: Dimensions,
    /// Maps working-image coordinates to source coordinates.
    pub corrections: &'a Corrections<'a>,
}

/// A step of the scoring chain.
pub trait ResultScorer {
    /// Filter and/or rescore the candidates, returning the survivors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceLimit`] if the scorer cannot
    /// allocate its working buffers.
    fn score(
        &self,
        candidates: Vec<Candidate>,
        ctx: &ScoringContext<'_>,
    ) -> Result<Vec<Candidate>, PipelineError>;

    /// `true` for filters that only remove candidates based on shape.
    fn is_structural(&self) -> bool;
}

impl ResultScorer for ResultScorerKind {
    fn score(
        &self,
        candidates: Vec<Candidate>,
        ctx: &ScoringContext<'_>,
    ) -> Result<Vec<Candidate>, PipelineError> {
        match *self {
            Self::VertexCount => Ok(candidates
                .into_iter()
                .filter(|c| c.polygon.len() == 4)
                .collect()),
            Self::Convexity => Ok(candidates
                .into_iter()
                .filter(|c| geometry::is_convex(c.polygon.points()))
                .collect()),
            Self::Area {
                margin_px,
                min_fraction,
            } => Ok(score_area(candidates, ctx.source, margin_px, min_fraction)),
            Self::LineCoherence { lines, top_k } => {
                let segments = source_segments(ctx, &lines)?;
                Ok(score_line_coherence(candidates, &segments, top_k))
            }
        }
    }

    fn is_structural(&self) -> bool {
        matches!(self, Self::VertexCount | Self::Convexity)
    }
}

fn score_area(
    candidates: Vec<Candidate>,
    source: Dimensions,
    margin_px: u32,
    min_fraction: f64,
) -> Vec<Candidate> {
    let margin = f64::from(margin_px);
    let source_area = source.area();
    let max_area =
        (f64::from(source.height) - margin).max(0.0) * (f64::from(source.width) - margin).max(0.0);
    let min_area = min_fraction * max_area;

    candidates
        .into_iter()
        .filter_map(|mut c| {
            let area = geometry::polygon_area(c.polygon.points());
            if area >= max_area || area < min_area || area <= 0.0 {
                return None;
            }
            c.score -= source_area / area;
            Some(c)
        })
        .collect()
}

/// Detect segments on the processed image and map them into source space.
pub(crate) fn source_segments(
    ctx: &ScoringContext<'_>,
    params: &HoughParams,
) -> Result<Vec<LineSegment>, PipelineError> {
    let mut segments = hough::detect_segments(ctx.processed, params)?;
    for segment in &mut segments {
        let mut ends = [segment.start, segment.end];
        ctx.corrections.apply(&mut ends);
        segment.start = ends[0];
        segment.end = ends[1];
    }
    debug!(segments = segments.len(), "line segments detected");
    Ok(segments)
}

/// Rank candidates by enclosed area per enclosed segment (smaller is
/// better) and add `top_k - rank` to the best `top_k`. Candidates that
/// enclose no segment rank last and get nothing.
#[must_use]
pub fn score_line_coherence(
    mut candidates: Vec<Candidate>,
    segments: &[LineSegment],
    top_k: usize,
) -> Vec<Candidate> {
    let metrics: Vec<Option<f64>> = candidates
        .iter()
        .map(|c| {
            let ring = c.polygon.points();
            let enclosed = segments
                .iter()
                .filter(|s| {
                    geometry::contains_or_touches(ring, s.start)
                        && geometry::contains_or_touches(ring, s.end)
                })
                .count();
            (enclosed > 0).then(|| geometry::polygon_area(ring) / as_f64(enclosed))
        })
        .collect();

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| match (metrics[a], metrics[b]) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    for (rank, &index) in order.iter().take(top_k).enumerate() {
        if metrics[index].is_some() {
            candidates[index].score += as_f64(top_k - rank);
        }
    }
    candidates
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(n: usize) -> f64 {
    n as f64
}

/// Check that no structural filter follows a numeric scorer.
///
/// # Errors
///
/// Returns a message naming the misplaced filter.
pub fn validate_chain(scorers: &[ResultScorerKind]) -> Result<(), String> {
    let mut numeric_seen: Option<&str> = None;
    for scorer in scorers {
        match (scorer.is_structural(), numeric_seen) {
            (true, Some(numeric)) => {
                return Err(format!(
                    "structural filter {} must run before {numeric}",
                    scorer.name()
                ));
            }
            (false, None) => numeric_seen = Some(scorer.name()),
            _ => {}
        }
        match *scorer {
            ResultScorerKind::Area { min_fraction, .. } if !(min_fraction > 0.0 && min_fraction <= 1.0) => {
                return Err(format!("area min_fraction must be in (0, 1], got {min_fraction}"));
            }
            ResultScorerKind::LineCoherence { lines, top_k } => {
                if top_k == 0 {
                    return Err("line_coherence top_k must be positive".to_owned());
                }
                lines.validate()?;
            }
            _ => {}
        }
    }
    Ok(())
}
