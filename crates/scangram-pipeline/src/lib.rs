//! scangram-pipeline: document detection and perspective rectification
//! (sans-IO).
//!
//! Finds the dominant quadrilateral in a photograph of a paper document
//! and returns it as an upright JPEG:
//! decode -> grayscale -> preprocessing chain -> contour tracing ->
//! contour detectors -> coordinate correction -> scoring chain ->
//! winner selection -> perspective warp -> JPEG encode.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices (or any [`std::io::Read`]) and returns structured data. File
//! handling and logging setup live in the `scangram` binary.
//!
//! Every strategy is plain configuration data ([`PreprocessorKind`],
//! [`ContourDetectorKind`], [`ResultScorerKind`]) backed by a trait
//! ([`Preprocessor`], [`ContourDetector`], [`ResultScorer`]).

pub mod config;
pub mod contour;
pub mod decode;
pub mod detect;
pub mod diagnostics;
pub mod edge;
pub mod extract;
pub mod filter;
pub mod geometry;
pub mod hough;
pub mod pipeline;
pub mod preprocess;
pub mod resize;
pub mod score;
pub mod simplify;
pub mod types;

pub use config::PipelineConfig;
pub use decode::DecodeLimits;
pub use detect::{ContourDetector, ContourDetectorKind};
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use hough::{HoughParams, LineSegment};
pub use pipeline::{DocumentScanner, Pipeline, StagedResult};
pub use preprocess::{EdgeMapParams, Preprocessor, PreprocessorKind};
pub use resize::ResizeFilter;
pub use score::{ResultScorer, ResultScorerKind};
pub use types::{Candidate, Detection, Dimensions, PipelineError, Point, Polyline};

/// Detect, rectify and JPEG-encode the document in `image_bytes`.
///
/// Returns `Ok(None)` when the image holds no plausible document.
/// Prefer [`DocumentScanner`] when processing many images with one
/// configuration, which validates it once.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation,
/// [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`] for
/// unusable input, and [`PipelineError::ResourceLimit`] when the image
/// exceeds the configured bounds.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<Option<Vec<u8>>, PipelineError> {
    config.validate()?;
    Pipeline::new(image_bytes, config)
        .decode()?
        .preprocess()?
        .detect()
        .correct()
        .score()?
        .select()
        .extract()
        .encode()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn process_empty_input_returns_error() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_garbage_returns_decode_error() {
        let result = process(&[0xFF, 0x00, 0x12, 0x34], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_validates_config() {
        let config = PipelineConfig {
            scorers: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            process(&[1, 2, 3], &config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
