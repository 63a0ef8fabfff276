//! Pipeline diagnostics: timing and counts for each stage.
//!
//! [`process_with_diagnostics`] drives the same typestate pipeline as
//! [`DocumentScanner::process`](crate::DocumentScanner::process) and
//! records how long each stage took and what it produced. Time is read
//! through the [`Clock`] trait so the crate never touches a platform
//! clock itself.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::edge;
use crate::pipeline::Pipeline;
use crate::types::PipelineError;

/// Source of monotonic time for stage timing.
pub trait Clock {
    /// A point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration seconds must be finite and non-negative"))
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Input decoding.
    pub decode: StageDiagnostics,
    /// Grayscale conversion and the preprocessing chain.
    pub preprocess: StageDiagnostics,
    /// Contour tracing and every detector.
    pub detect: StageDiagnostics,
    /// Mapping candidates into source space.
    pub correct: StageDiagnostics,
    /// One entry per scoring-chain step, in chain order.
    pub scoring: Vec<StageDiagnostics>,
    /// Winner selection and perspective rectification.
    pub extract: StageDiagnostics,
    /// JPEG encoding (only when a document was found).
    pub encode: Option<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Input decoding.
    Decode {
        /// Size of the input in bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Preprocessing chain.
    Preprocess {
        /// Names of the stages that ran, in order.
        stages: Vec<String>,
        /// Final working image width.
        width: u32,
        /// Final working image height.
        height: u32,
        /// Non-zero pixels in the final working image.
        edge_pixel_count: usize,
    },
    /// Contour tracing and detection.
    Detect {
        /// Contours traced from the working image.
        contour_count: usize,
        /// Candidates produced by each detector, in detector order.
        per_detector: Vec<usize>,
    },
    /// Coordinate correction.
    Correct {
        /// Candidates mapped into source space.
        candidate_count: usize,
    },
    /// One scoring-chain step.
    Score {
        /// Scorer name.
        scorer: String,
        /// Candidates left after this step.
        survivors: usize,
    },
    /// Selection and rectification.
    Extract {
        /// Score of the winner, if any.
        winner_score: Option<f64>,
        /// Rectified output size, if a document was found.
        output_size: Option<(u32, u32)>,
    },
    /// JPEG encoding.
    Encode {
        /// Encoded output size in bytes.
        output_bytes: usize,
        /// JPEG quality used.
        quality: u8,
    },
}

/// High-level summary counts for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Contours traced.
    pub contour_count: usize,
    /// Candidates before scoring.
    pub candidate_count: usize,
    /// Candidates after scoring.
    pub survivor_count: usize,
    /// Whether a document was found.
    pub found: bool,
}

impl PipelineDiagnostics {
    /// Format a human-readable multi-line report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages: Vec<(String, &StageDiagnostics)> = vec![
            ("Decode".to_owned(), &self.decode),
            ("Preprocess".to_owned(), &self.preprocess),
            ("Detect".to_owned(), &self.detect),
            ("Correct".to_owned(), &self.correct),
        ];
        for step in &self.scoring {
            let name = match &step.metrics {
                StageMetrics::Score { scorer, .. } => format!("Score: {scorer}"),
                _ => "Score".to_owned(),
            };
            stages.push((name, step));
        }
        stages.push(("Extract".to_owned(), &self.extract));
        if let Some(ref encode) = self.encode {
            stages.push(("Encode".to_owned(), encode));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Candidates: {} -> {}  |  Document: {}",
            self.summary.contour_count,
            self.summary.candidate_count,
            self.summary.survivor_count,
            if self.summary.found { "found" } else { "none" },
        ));

        lines.join("\n")
    }

    /// Total time spent in the scoring chain.
    #[must_use]
    pub fn scoring_duration(&self) -> Duration {
        self.scoring.iter().map(|s| s.duration).sum()
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Preprocess {
            stages,
            width,
            height,
            edge_pixel_count,
        } => format!(
            "[{}] -> {width}x{height}, edges={edge_pixel_count}",
            stages.join(", ")
        ),
        StageMetrics::Detect {
            contour_count,
            per_detector,
        } => {
            let counts: Vec<String> = per_detector.iter().map(ToString::to_string).collect();
            format!("{contour_count} contours, candidates=[{}]", counts.join(" "))
        }
        StageMetrics::Correct { candidate_count } => format!("{candidate_count} candidates"),
        StageMetrics::Score { survivors, .. } => format!("{survivors} survivors"),
        StageMetrics::Extract {
            winner_score,
            output_size,
        } => match (winner_score, output_size) {
            (Some(score), Some((w, h))) => format!("score={score:.3} -> {w}x{h}"),
            _ => "no document".to_owned(),
        },
        StageMetrics::Encode {
            output_bytes,
            quality,
        } => format!("q={quality} {output_bytes} bytes"),
    }
}

/// Run the pipeline, recording per-stage timing and counts.
///
/// Produces the same output as
/// [`DocumentScanner::process`](crate::DocumentScanner::process).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation,
/// otherwise the first stage error.
pub fn process_with_diagnostics<C: Clock>(
    bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Option<Vec<u8>>, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let run_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(bytes, config).decode()?;
    let (image_width, image_height) = decoded.source().dimensions();
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: bytes.len(),
            width: image_width,
            height: image_height,
        },
    };

    let start = clock.now();
    let preprocessed = decoded.preprocess()?;
    let preprocess = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Preprocess {
            stages: config
                .preprocessors
                .iter()
                .map(|s| s.name().to_owned())
                .collect(),
            width: preprocessed.working().width(),
            height: preprocessed.working().height(),
            edge_pixel_count: edge::count_edge_pixels(preprocessed.working()),
        },
    };

    let start = clock.now();
    let detected = preprocessed.detect();
    let contour_count = detected.contours().len();
    let candidate_count = detected.candidates().len();
    let detect = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Detect {
            contour_count,
            per_detector: detected.candidates_per_detector(),
        },
    };

    let start = clock.now();
    let corrected = detected.correct();
    let correct = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Correct { candidate_count },
    };

    let mut scoring = Vec::with_capacity(config.scorers.len());
    let mut lap = clock.now();
    let scored = corrected.score_observed(|scorer, survivors| {
        scoring.push(StageDiagnostics {
            duration: clock.elapsed(&lap),
            metrics: StageMetrics::Score {
                scorer: scorer.name().to_owned(),
                survivors,
            },
        });
        lap = clock.now();
    })?;
    let survivor_count = scored.survivors().len();

    let start = clock.now();
    let extracted = scored.select().extract();
    let winner_score = extracted.detection().map(|d| d.score);
    let output_size = extracted.rectified().map(image::RgbImage::dimensions);
    let extract = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Extract {
            winner_score,
            output_size,
        },
    };

    let start = clock.now();
    let found = output_size.is_some();
    let output = extracted.encode()?;
    let encode = output.as_ref().map(|jpeg| StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Encode {
            output_bytes: jpeg.len(),
            quality: config.jpeg_quality,
        },
    });

    let diagnostics = PipelineDiagnostics {
        decode,
        preprocess,
        detect,
        correct,
        scoring,
        extract,
        encode,
        total_duration: clock.elapsed(&run_start),
        summary: PipelineSummary {
            image_width,
            image_height,
            contour_count,
            candidate_count,
            survivor_count,
            found,
        },
    };
    Ok((output, diagnostics))
}
