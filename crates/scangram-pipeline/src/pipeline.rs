//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use scangram_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(jpeg: &[u8]) -> Result<(), PipelineError> {
//! let config = PipelineConfig::default();
//! let output = Pipeline::new(jpeg, &config)
//!     .decode()?
//!     .preprocess()?
//!     .detect()
//!     .correct()
//!     .score()?
//!     .select()
//!     .extract()
//!     .encode()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state. Images a
//! later stage does not need are dropped on the transition: the working
//! image goes away at [`Scored::select`], the source at
//! [`Selected::extract`].
//!
//! The stages borrow the configuration, which must already have passed
//! [`PipelineConfig::validate`]. [`DocumentScanner`] is the validated
//! entry point.

use std::io::Read;

use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::contour;
use crate::decode;
use crate::detect;
use crate::extract;
use crate::hough::LineSegment;
use crate::preprocess::{self, Corrections};
use crate::score::{self, ResultScorer, ResultScorerKind, ScoringContext};
use crate::types::{
    Candidate, Detection, Dimensions, GrayImage, PipelineError, Polyline, RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending<'a> {
    config: &'a PipelineConfig,
    bytes: &'a [u8],
}

impl<'a> Pending<'a> {
    /// The raw input bytes.
    #[must_use]
    pub const fn bytes(&self) -> &[u8] {
        self.bytes
    }

    /// Decode the input and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`], [`PipelineError::ImageDecode`]
    /// or [`PipelineError::ResourceLimit`] as [`decode::decode`] does.
    pub fn decode(self) -> Result<Decoded<'a>, PipelineError> {
        let source = decode::decode(self.bytes, &self.config.limits)?;
        debug!(
            width = source.width(),
            height = source.height(),
            "input decoded"
        );
        Ok(Decoded {
            config: self.config,
            source,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding. Holds the full-resolution source.
#[must_use = "pipeline stages are consumed by advancing; call .preprocess() to continue"]
pub struct Decoded<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
}

impl<'a> Decoded<'a> {
    /// The decoded source image.
    #[must_use]
    pub const fn source(&self) -> &RgbImage {
        &self.source
    }

    /// Convert to grayscale and run the preprocessing chain.
    ///
    /// # Errors
    ///
    /// Propagates the first stage error.
    pub fn preprocess(self) -> Result<Preprocessed<'a>, PipelineError> {
        let gray = decode::to_grayscale(&self.source);
        let (working, corrections) = preprocess::run_chain(&self.config.preprocessors, gray)?;
        Ok(Preprocessed {
            config: self.config,
            source: self.source,
            working,
            corrections,
        })
    }
}

// ───────────────────────── Stage 2: Preprocessed ─────────────────────

/// Pipeline state after preprocessing: the final working image and the
/// corrections that map it back to source space.
#[must_use = "pipeline stages are consumed by advancing; call .detect() to continue"]
pub struct Preprocessed<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
    working: GrayImage,
    corrections: Corrections<'a>,
}

impl<'a> Preprocessed<'a> {
    /// The final working image (an edge map with the default chain).
    #[must_use]
    pub const fn working(&self) -> &GrayImage {
        &self.working
    }

    /// Recorded per-stage corrections.
    #[must_use]
    pub const fn corrections(&self) -> &Corrections<'a> {
        &self.corrections
    }

    /// Trace contours once and run every detector over them.
    pub fn detect(self) -> Detected<'a> {
        let contours = contour::trace_contours(&self.working);
        let candidates = detect::detect_all(&self.config.detectors, &contours);
        debug!(
            contours = contours.len(),
            candidates = candidates.len(),
            "candidates detected"
        );
        Detected {
            config: self.config,
            source: self.source,
            working: self.working,
            corrections: self.corrections,
            contours,
            candidates,
        }
    }
}

// ───────────────────────── Stage 3: Detected ─────────────────────────

/// Pipeline state after detection. Candidate coordinates are still in
/// working-image space.
#[must_use = "pipeline stages are consumed by advancing; call .correct() to continue"]
pub struct Detected<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
    working: GrayImage,
    corrections: Corrections<'a>,
    contours: Vec<Polyline>,
    candidates: Vec<Candidate>,
}

impl<'a> Detected<'a> {
    /// Contours traced from the working image, in working-image space.
    #[must_use]
    pub fn contours(&self) -> &[Polyline] {
        &self.contours
    }

    /// Raw candidates of every detector, in detector order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of candidates produced by each detector, in detector order.
    #[must_use]
    pub fn candidates_per_detector(&self) -> Vec<usize> {
        let mut counts = vec![0; self.config.detectors.len()];
        for candidate in &self.candidates {
            if let Some(count) = counts.get_mut(candidate.detector) {
                *count += 1;
            }
        }
        counts
    }

    /// Map every candidate vertex into source-image space.
    pub fn correct(mut self) -> Corrected<'a> {
        for candidate in &mut self.candidates {
            self.corrections.apply(candidate.polygon.points_mut());
        }
        Corrected {
            config: self.config,
            source: self.source,
            working: self.working,
            corrections: self.corrections,
            contour_count: self.contours.len(),
            candidates: self.candidates,
        }
    }
}

// ───────────────────────── Stage 4: Corrected ────────────────────────

/// Pipeline state with every candidate in source-image space.
#[must_use = "pipeline stages are consumed by advancing; call .score() to continue"]
pub struct Corrected<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
    working: GrayImage,
    corrections: Corrections<'a>,
    contour_count: usize,
    candidates: Vec<Candidate>,
}

impl<'a> Corrected<'a> {
    /// Candidates in source-image space.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// The working image the candidates were detected on.
    #[must_use]
    pub const fn working(&self) -> &GrayImage {
        &self.working
    }

    /// Number of contours that were traced.
    #[must_use]
    pub const fn contour_count(&self) -> usize {
        self.contour_count
    }

    /// Segments the first line-coherence scorer would see, in source
    /// space. Empty when the chain has no such scorer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceLimit`] if the Hough accumulator
    /// is too large.
    pub fn line_segments(&self) -> Result<Vec<LineSegment>, PipelineError> {
        let lines = self.config.scorers.iter().find_map(|s| match s {
            ResultScorerKind::LineCoherence { lines, .. } => Some(*lines),
            _ => None,
        });
        match lines {
            Some(params) => score::source_segments(&self.context(), &params),
            None => Ok(Vec::new()),
        }
    }

    fn context(&self) -> ScoringContext<'_> {
        ScoringContext {
            processed: &self.working,
            source: Dimensions::of(&self.source),
            corrections: &self.corrections,
        }
    }

    /// Run the scoring chain.
    ///
    /// # Errors
    ///
    /// Propagates the first scorer error.
    pub fn score(self) -> Result<Scored<'a>, PipelineError> {
        self.score_observed(|_, _| {})
    }

    /// Run the scoring chain, calling `observe` after every step with the
    /// step and the number of candidates that survived it.
    ///
    /// # Errors
    ///
    /// Propagates the first scorer error.
    pub fn score_observed<F>(self, mut observe: F) -> Result<Scored<'a>, PipelineError>
    where
        F: FnMut(&ResultScorerKind, usize),
    {
        let raw_count = self.candidates.len();
        let ctx = ScoringContext {
            processed: &self.working,
            source: Dimensions::of(&self.source),
            corrections: &self.corrections,
        };
        let mut survivors = self.candidates;
        for scorer in &self.config.scorers {
            survivors = scorer.score(survivors, &ctx)?;
            debug!(
                scorer = scorer.name(),
                survivors = survivors.len(),
                "scoring step done"
            );
            observe(scorer, survivors.len());
        }
        Ok(Scored {
            config: self.config,
            source: self.source,
            working: self.working,
            raw_count,
            survivors,
        })
    }
}

// ───────────────────────── Stage 5: Scored ───────────────────────────

/// Pipeline state after the scoring chain.
#[must_use = "pipeline stages are consumed by advancing; call .select() to continue"]
pub struct Scored<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
    working: GrayImage,
    raw_count: usize,
    survivors: Vec<Candidate>,
}

impl<'a> Scored<'a> {
    /// Candidates that survived every filter, with their final scores.
    #[must_use]
    pub fn survivors(&self) -> &[Candidate] {
        &self.survivors
    }

    /// Number of candidates before scoring.
    #[must_use]
    pub const fn raw_count(&self) -> usize {
        self.raw_count
    }

    /// The working image the candidates were detected on.
    #[must_use]
    pub const fn working(&self) -> &GrayImage {
        &self.working
    }

    /// Pick the highest-scoring survivor, the earliest one on ties, and
    /// order its corners.
    ///
    /// A winner whose corners cannot be assigned four distinct roles (not
    /// a quadrilateral, or rotated by about 45 degrees) yields no
    /// detection.
    pub fn select(self) -> Selected<'a> {
        let winner = self.survivors.into_iter().reduce(|best, c| {
            if c.score > best.score { c } else { best }
        });
        let detection = winner.and_then(|winner| {
            let Some(corners) = extract::order_corners(winner.polygon.points())
                .filter(extract::has_distinct_corners)
            else {
                warn!(
                    vertices = winner.polygon.len(),
                    score = winner.score,
                    "winning candidate has no usable corner ordering"
                );
                return None;
            };
            Some(Detection {
                corners,
                score: winner.score,
                detector: winner.detector,
            })
        });
        Selected {
            config: self.config,
            source: self.source,
            detection,
        }
    }
}

// ───────────────────────── Stage 6: Selected ─────────────────────────

/// Pipeline state once the winner, if any, has been chosen.
#[must_use = "pipeline stages are consumed by advancing; call .extract() to continue"]
pub struct Selected<'a> {
    config: &'a PipelineConfig,
    source: RgbImage,
    detection: Option<Detection>,
}

impl<'a> Selected<'a> {
    /// The winning quadrilateral with ordered corners, in source space.
    #[must_use]
    pub const fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    /// Consume the stage, keeping only the detection.
    #[must_use]
    pub fn into_detection(self) -> Option<Detection> {
        self.detection
    }

    /// Perspective-rectify the winner out of the source image.
    ///
    /// Corners that do not define a perspective transform drop the
    /// detection, so the run ends with no document.
    pub fn extract(self) -> Extracted<'a> {
        let (detection, rectified) = match self.detection {
            Some(detection) => match extract::rectify(&self.source, &detection.corners) {
                Ok(rectified) => (Some(detection), Some(rectified)),
                Err(e) => {
                    warn!(corners = ?detection.corners, error = %e, "winner could not be rectified");
                    (None, None)
                }
            },
            None => (None, None),
        };
        Extracted {
            config: self.config,
            detection,
            rectified,
        }
    }
}

// ───────────────────────── Stage 7: Extracted ────────────────────────

/// Pipeline state holding the rectified document, if one was found.
#[must_use = "pipeline stages are consumed by advancing; call .encode() to continue"]
pub struct Extracted<'a> {
    config: &'a PipelineConfig,
    detection: Option<Detection>,
    rectified: Option<RgbImage>,
}

impl Extracted<'_> {
    /// The winning quadrilateral.
    #[must_use]
    pub const fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    /// The rectified document image.
    #[must_use]
    pub const fn rectified(&self) -> Option<&RgbImage> {
        self.rectified.as_ref()
    }

    /// Consume the stage, returning the detection and rectified image.
    #[must_use]
    pub fn into_parts(self) -> (Option<Detection>, Option<RgbImage>) {
        (self.detection, self.rectified)
    }

    /// Encode the rectified document as JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if the encoder fails.
    pub fn encode(self) -> Result<Option<Vec<u8>>, PipelineError> {
        self.rectified
            .map(|image| decode::encode_jpeg(&image, self.config.jpeg_quality))
            .transpose()
    }
}

/// Entry point for the typestate pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over `bytes`. Nothing runs until
    /// [`.decode()`](Pending::decode) is called.
    ///
    /// `config` is not validated here; see [`DocumentScanner`].
    #[allow(clippy::new_ret_no_self)]
    pub const fn new<'a>(bytes: &'a [u8], config: &'a PipelineConfig) -> Pending<'a> {
        Pending { config, bytes }
    }
}

/// Every intermediate of one run, for previews and debugging.
///
/// All geometry is in source-image space.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Source image dimensions.
    pub dimensions: Dimensions,
    /// Decoded source image.
    pub source: RgbImage,
    /// Final working image.
    pub working: GrayImage,
    /// Traced contours.
    pub contours: Vec<Polyline>,
    /// Candidates before scoring.
    pub candidates: Vec<Candidate>,
    /// Segments seen by the line-coherence scorer.
    pub segments: Vec<LineSegment>,
    /// Candidates that survived scoring.
    pub survivors: Vec<Candidate>,
    /// The winner.
    pub detection: Option<Detection>,
    /// The rectified document.
    pub rectified: Option<RgbImage>,
}

/// Validated, immutable document scanner.
///
/// Holds no per-call state, so one scanner can serve any number of
/// threads concurrently.
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    config: PipelineConfig,
}

impl DocumentScanner {
    /// Build a scanner from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The scanner's configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a typestate pipeline over `bytes` with this scanner's
    /// configuration.
    pub const fn pipeline<'a>(&'a self, bytes: &'a [u8]) -> Pending<'a> {
        Pipeline::new(bytes, &self.config)
    }

    /// Find the document quadrilateral without rectifying it.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    #[instrument(skip_all, fields(input_len = bytes.len()))]
    pub fn detect(&self, bytes: &[u8]) -> Result<Option<Detection>, PipelineError> {
        let detection = self
            .pipeline(bytes)
            .decode()?
            .preprocess()?
            .detect()
            .correct()
            .score()?
            .select()
            .into_detection();
        info!(found = detection.is_some(), "detection finished");
        Ok(detection)
    }

    /// Detect, rectify and JPEG-encode the document in `bytes`.
    ///
    /// Returns `Ok(None)` when no candidate survives scoring or the winner
    /// cannot be rectified.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    #[instrument(skip_all, fields(input_len = bytes.len()))]
    pub fn process(&self, bytes: &[u8]) -> Result<Option<Vec<u8>>, PipelineError> {
        let output = self
            .pipeline(bytes)
            .decode()?
            .preprocess()?
            .detect()
            .correct()
            .score()?
            .select()
            .extract()
            .encode()?;
        info!(
            found = output.is_some(),
            output_len = output.as_ref().map_or(0, Vec::len),
            "document processed"
        );
        Ok(output)
    }

    /// Read all of `reader` and [`process`](Self::process) it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if reading fails, otherwise as
    /// [`process`](Self::process).
    pub fn process_reader<R: Read>(&self, mut reader: R) -> Result<Option<Vec<u8>>, PipelineError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.process(&bytes)
    }

    /// Run every stage and keep all intermediates.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    #[instrument(skip_all, fields(input_len = bytes.len()))]
    pub fn process_staged(&self, bytes: &[u8]) -> Result<StagedResult, PipelineError> {
        let preprocessed = self.pipeline(bytes).decode()?.preprocess()?;
        let dimensions = Dimensions::of(&preprocessed.source);
        let source = preprocessed.source.clone();
        let detected = preprocessed.detect();

        let mut contours = detected.contours().to_vec();
        for contour in &mut contours {
            detected.corrections.apply(contour.points_mut());
        }

        let corrected = detected.correct();
        let candidates = corrected.candidates().to_vec();
        let segments = corrected.line_segments()?;
        let scored = corrected.score()?;
        let survivors = scored.survivors().to_vec();
        let working = scored.working().clone();
        let (detection, rectified) = scored.select().extract().into_parts();

        info!(
            candidates = candidates.len(),
            survivors = survivors.len(),
            found = detection.is_some(),
            "staged run finished"
        );
        Ok(StagedResult {
            dimensions,
            source,
            working,
            contours,
            candidates,
            segments,
            survivors,
            detection,
            rectified,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;
    use image::Rgb;

    /// PNG of a white rectangle on black.
    fn document_png() -> Vec<u8> {
        let img = RgbImage::from_fn(320, 240, |x, y| {
            if (70..250).contains(&x) && (55..185).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn pending_exposes_bytes() {
        let png = document_png();
        let config = PipelineConfig::default();
        assert_eq!(Pipeline::new(&png, &config).bytes().len(), png.len());
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let config = PipelineConfig::default();
        let result = Pipeline::new(&[], &config).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decoded_exposes_source() {
        let png = document_png();
        let config = PipelineConfig::default();
        let decoded = Pipeline::new(&png, &config).decode().unwrap();
        assert_eq!(decoded.source().dimensions(), (320, 240));
    }

    #[test]
    fn preprocessed_working_image_is_padded() {
        let png = document_png();
        let config = PipelineConfig::default();
        let preprocessed = Pipeline::new(&png, &config)
            .decode()
            .unwrap()
            .preprocess()
            .unwrap();
        assert_eq!(preprocessed.working().dimensions(), (330, 250));
        assert_eq!(preprocessed.corrections().states().len(), 2);
    }

    #[test]
    fn per_detector_counts_sum_to_total() {
        let png = document_png();
        let config = PipelineConfig::default();
        let detected = Pipeline::new(&png, &config)
            .decode()
            .unwrap()
            .preprocess()
            .unwrap()
            .detect();
        let counts = detected.candidates_per_detector();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts.iter().sum::<usize>(), detected.candidates().len());
        assert!(counts.iter().all(|&n| n == detected.contours().len()));
    }

    #[test]
    fn observer_sees_every_scorer() {
        let png = document_png();
        let config = PipelineConfig::default();
        let mut seen = Vec::new();
        let corrected = Pipeline::new(&png, &config)
            .decode()
            .unwrap()
            .preprocess()
            .unwrap()
            .detect()
            .correct();
        let raw = corrected.candidates().len();
        let scored = corrected
            .score_observed(|scorer, survivors| seen.push((scorer.name(), survivors)))
            .unwrap();
        let names: Vec<&str> = seen.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["vertex_count", "convexity", "area", "line_coherence"]);
        let mut previous = raw;
        for &(_, survivors) in &seen {
            assert!(survivors <= previous);
            previous = survivors;
        }
        assert_eq!(scored.survivors().len(), previous);
        assert_eq!(scored.raw_count(), raw);
    }

    #[test]
    fn select_prefers_earliest_on_ties() {
        let config = PipelineConfig::default();
        let quad = |x: f64| {
            Polyline::new(vec![
                Point::new(x, 0.0),
                Point::new(x + 10.0, 0.0),
                Point::new(x + 10.0, 10.0),
                Point::new(x, 10.0),
            ])
        };
        let scored = Scored {
            config: &config,
            source: RgbImage::new(1, 1),
            working: GrayImage::new(1, 1),
            raw_count: 3,
            survivors: vec![
                Candidate::new(quad(0.0), 5.0, 0),
                Candidate::new(quad(20.0), 7.0, 1),
                Candidate::new(quad(40.0), 7.0, 2),
            ],
        };
        let detection = scored.select().into_detection().unwrap();
        assert_eq!(detection.detector, 1);
        assert_eq!(detection.corners[0], Point::new(20.0, 0.0));
    }

    #[test]
    fn select_drops_non_quad_winner() {
        let config = PipelineConfig::default();
        let triangle = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 10.0),
        ]);
        let scored = Scored {
            config: &config,
            source: RgbImage::new(1, 1),
            working: GrayImage::new(1, 1),
            raw_count: 1,
            survivors: vec![Candidate::new(triangle, 1.0, 0)],
        };
        assert!(scored.select().detection().is_none());
    }

    #[test]
    fn diamond_winner_yields_no_document() {
        let config = PipelineConfig::default();
        let diamond = Polyline::new(vec![
            Point::new(200.0, 50.0),
            Point::new(350.0, 200.0),
            Point::new(200.0, 350.0),
            Point::new(50.0, 200.0),
        ]);
        let scored = Scored {
            config: &config,
            source: RgbImage::new(400, 400),
            working: GrayImage::new(1, 1),
            raw_count: 1,
            survivors: vec![Candidate::new(diamond, 20.0, 0)],
        };
        let extracted = scored.select().extract();
        assert!(extracted.detection().is_none());
        assert!(extracted.rectified().is_none());
        assert_eq!(extracted.encode().unwrap(), None);
    }

    #[test]
    fn unrectifiable_winner_yields_no_document() {
        let config = PipelineConfig::default();
        let p = Point::new(3.0, 3.0);
        let selected = Selected {
            config: &config,
            source: RgbImage::new(8, 8),
            detection: Some(Detection {
                corners: [p, p, p, p],
                score: 1.0,
                detector: 0,
            }),
        };
        let extracted = selected.extract();
        assert!(extracted.detection().is_none());
        assert_eq!(extracted.encode().unwrap(), None);
    }

    #[test]
    fn scanner_rejects_invalid_config() {
        let config = PipelineConfig {
            jpeg_quality: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            DocumentScanner::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn process_reader_matches_process() {
        let png = document_png();
        let scanner = DocumentScanner::new(PipelineConfig::default()).unwrap();
        let direct = scanner.process(&png).unwrap();
        let read = scanner.process_reader(png.as_slice()).unwrap();
        assert_eq!(direct, read);
    }

    #[test]
    fn staged_result_agrees_with_detect() {
        let png = document_png();
        let scanner = DocumentScanner::new(PipelineConfig::default()).unwrap();
        let staged = scanner.process_staged(&png).unwrap();
        assert_eq!(staged.dimensions, Dimensions { width: 320, height: 240 });
        assert_eq!(staged.source.dimensions(), (320, 240));
        assert!(staged.survivors.len() <= staged.candidates.len());
        assert_eq!(staged.detection, scanner.detect(&png).unwrap());
        assert_eq!(staged.detection.is_some(), staged.rectified.is_some());
    }

    #[test]
    fn scanner_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocumentScanner>();
    }
}
