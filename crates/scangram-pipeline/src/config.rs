//! Pipeline configuration.
//!
//! [`PipelineConfig`] is plain serializable data: the ordered stage,
//! detector and scorer lists plus output and decoding settings. It is
//! validated once, when a [`DocumentScanner`](crate::DocumentScanner) is
//! built, and is never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::decode::DecodeLimits;
use crate::detect::ContourDetectorKind;
use crate::preprocess::PreprocessorKind;
use crate::resize::ResizeFilter;
use crate::score::{self, ResultScorerKind};
use crate::types::PipelineError;

/// Configuration for the document pipeline.
///
/// The defaults reproduce the tuned detector: resize to 1600 px tall,
/// the edge-map stage, three detectors, and the four-step scoring chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Preprocessing stages, applied in order.
    pub preprocessors: Vec<PreprocessorKind>,
    /// Contour detectors. All of them run; their candidates are pooled.
    pub detectors: Vec<ContourDetectorKind>,
    /// Filters and scorers, applied in order.
    pub scorers: Vec<ResultScorerKind>,
    /// JPEG quality of the rectified output (1-100).
    pub jpeg_quality: u8,
    /// Bounds applied while decoding the input.
    pub limits: DecodeLimits,
}

impl PipelineConfig {
    /// Default JPEG output quality.
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    /// Check every invariant the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.check().map_err(PipelineError::InvalidConfig)
    }

    fn check(&self) -> Result<(), String> {
        for stage in &self.preprocessors {
            match stage {
                PreprocessorKind::Resize { max_height: 0, .. } => {
                    return Err("resize max_height must be positive".to_owned());
                }
                PreprocessorKind::Resize { .. } => {}
                PreprocessorKind::EdgeMap(params) => params.validate()?,
            }
        }

        if self.detectors.is_empty() {
            return Err("at least one contour detector is required".to_owned());
        }
        for detector in &self.detectors {
            let epsilon = detector.epsilon();
            if !(epsilon > 0.0 && epsilon.is_finite()) {
                return Err(format!(
                    "{} detector epsilon must be positive and finite, got {epsilon}",
                    detector.name()
                ));
            }
        }

        if !self
            .scorers
            .iter()
            .any(|s| matches!(s, ResultScorerKind::VertexCount))
        {
            return Err("the scoring chain must include the vertex_count filter".to_owned());
        }
        score::validate_chain(&self.scorers)?;

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            ));
        }
        Ok(())
    }

    /// Set the height every resize stage scales to, adding a resize stage
    /// at the front when there is none.
    #[must_use]
    pub fn with_max_height(mut self, max_height: u32) -> Self {
        let mut found = false;
        for stage in &mut self.preprocessors {
            if let PreprocessorKind::Resize { max_height: h, .. } = stage {
                *h = max_height;
                found = true;
            }
        }
        if !found {
            self.preprocessors.insert(
                0,
                PreprocessorKind::Resize {
                    max_height,
                    filter: ResizeFilter::default(),
                },
            );
        }
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocessors: PreprocessorKind::default_chain(),
            detectors: ContourDetectorKind::default_set(),
            scorers: ResultScorerKind::default_chain(),
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
            limits: DecodeLimits::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn invalid_message(config: &PipelineConfig) -> String {
        match config.validate() {
            Err(PipelineError::InvalidConfig(msg)) => msg,
            other => format!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn default_matches_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.detectors.len(), 3);
        assert_eq!(config.scorers.len(), 4);
        assert!(matches!(
            config.preprocessors[0],
            PreprocessorKind::Resize {
                max_height: 1600,
                ..
            }
        ));
    }

    #[test]
    fn empty_detector_list_is_rejected() {
        let config = PipelineConfig {
            detectors: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(invalid_message(&config).contains("detector"));
    }

    #[test]
    fn non_finite_epsilon_is_rejected() {
        for epsilon in [0.0, -0.1, f64::INFINITY, f64::NAN] {
            let config = PipelineConfig {
                detectors: vec![ContourDetectorKind::Direct {
                    epsilon,
                    weight: 1.0,
                }],
                ..PipelineConfig::default()
            };
            assert!(invalid_message(&config).contains("epsilon"), "{epsilon}");
        }
    }

    #[test]
    fn zero_quality_and_zero_height_are_rejected() {
        let config = PipelineConfig {
            jpeg_quality: 0,
            ..PipelineConfig::default()
        };
        assert!(invalid_message(&config).contains("jpeg_quality"));

        let config = PipelineConfig::default().with_max_height(0);
        assert!(invalid_message(&config).contains("max_height"));
    }

    #[test]
    fn chain_without_vertex_filter_is_rejected() {
        let config = PipelineConfig {
            scorers: vec![ResultScorerKind::Convexity],
            ..PipelineConfig::default()
        };
        assert!(invalid_message(&config).contains("vertex_count"));
    }

    #[test]
    fn with_max_height_updates_existing_stage() {
        let config = PipelineConfig::default().with_max_height(800);
        assert_eq!(config.preprocessors.len(), 2);
        assert!(matches!(
            config.preprocessors[0],
            PreprocessorKind::Resize {
                max_height: 800,
                ..
            }
        ));
    }

    #[test]
    fn with_max_height_inserts_missing_stage() {
        let config = PipelineConfig {
            preprocessors: Vec::new(),
            ..PipelineConfig::default()
        }
        .with_max_height(640);
        assert_eq!(config.preprocessors.len(), 1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"jpeg_quality": 80}"#).unwrap();
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.detectors, ContourDetectorKind::default_set());
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let config = PipelineConfig::default().with_max_height(1200);
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
