//! Contour detectors: independent generators of candidate polygons.
//!
//! Every detector sees the same traced contours and returns its own
//! simplified polygons. The orchestrator concatenates all outputs, in
//! detector order, into one flat candidate set with no deduplication;
//! near-identical candidates from different detectors compete in the
//! scoring chain on their base weights.

use serde::{Deserialize, Serialize};

use crate::geometry;
use crate::simplify;
use crate::types::{Candidate, Polyline};

/// Selects a contour-to-polygon strategy and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContourDetectorKind {
    /// Simplify each contour directly.
    Direct {
        /// Simplification tolerance as a fraction of the contour perimeter.
        epsilon: f64,
        /// Initial score of every candidate this detector produces.
        weight: f64,
    },
    /// Simplify the convex hull of each contour. Recovers pages whose
    /// outline is dented by fingers, shadows or folded corners.
    ConvexHull {
        /// Simplification tolerance as a fraction of the hull perimeter.
        epsilon: f64,
        /// Initial score of every candidate this detector produces.
        weight: f64,
    },
}

impl ContourDetectorKind {
    /// The default detector list: a fine and a coarse direct
    /// simplification, then a coarse hull simplification, in decreasing
    /// base weight.
    #[must_use]
    pub fn default_set() -> Vec<Self> {
        vec![
            Self::Direct {
                epsilon: 0.005,
                weight: 20.0,
            },
            Self::Direct {
                epsilon: 0.03,
                weight: 15.0,
            },
            Self::ConvexHull {
                epsilon: 0.03,
                weight: 10.0,
            },
        ]
    }

    /// Perimeter fraction passed to simplification.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        match *self {
            Self::Direct { epsilon, .. } | Self::ConvexHull { epsilon, .. } => epsilon,
        }
    }

    /// Short detector name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::ConvexHull { .. } => "convex_hull",
        }
    }
}

/// Trait for contour detection strategies.
///
/// Input: the contours traced from the final working image.
/// Output: one simplified polygon per contour, in contour order.
pub trait ContourDetector {
    /// Produce candidate polygons from traced contours.
    fn detect(&self, contours: &[Polyline]) -> Vec<Polyline>;

    /// Initial score assigned to this detector's candidates.
    fn base_weight(&self) -> f64;
}

impl ContourDetector for ContourDetectorKind {
    fn detect(&self, contours: &[Polyline]) -> Vec<Polyline> {
        match *self {
            Self::Direct { epsilon, .. } => contours
                .iter()
                .map(|c| simplify::simplify_closed_relative(c, epsilon))
                .collect(),
            Self::ConvexHull { epsilon, .. } => contours
                .iter()
                .map(|c| {
                    let hull = Polyline::new(geometry::convex_hull(c.points()));
                    simplify::simplify_closed_relative(&hull, epsilon)
                })
                .collect(),
        }
    }

    fn base_weight(&self) -> f64 {
        match *self {
            Self::Direct { weight, .. } | Self::ConvexHull { weight, .. } => weight,
        }
    }
}

/// Run every detector over the shared contours and concatenate their
/// output into one candidate set, in detector order.
#[must_use = "returns the raw candidate set"]
pub fn detect_all(detectors: &[ContourDetectorKind], contours: &[Polyline]) -> Vec<Candidate> {
    detectors
        .iter()
        .enumerate()
        .flat_map(|(index, detector)| {
            let weight = detector.base_weight();
            detector
                .detect(contours)
                .into_iter()
                .map(move |polygon| Candidate::new(polygon, weight, index))
        })
        .collect()
}
