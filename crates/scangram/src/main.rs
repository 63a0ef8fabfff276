//! scangram: detect and rectify the document in a photograph.
//!
//! Reads an image file, finds the page quadrilateral, and writes the
//! perspective-corrected page as JPEG. Optionally prints per-stage
//! diagnostics, repeats the run for timing, and dumps debug rasters of
//! the intermediate stages.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin scangram -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Exit status is 0 when a document was written, 2 when none was found,
//! and 1 on any error.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod dump;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use scangram_pipeline::diagnostics::{self, Clock, PipelineDiagnostics};
use scangram_pipeline::{DocumentScanner, PipelineConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when the image holds no document.
const EXIT_NO_DOCUMENT: u8 = 2;

/// Detect the document in a photograph and write it as an upright JPEG.
#[derive(Parser)]
#[command(name = "scangram", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Output JPEG path. Defaults to `<input stem>.scan.jpg` next to the
    /// input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pipeline config as a JSON file.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Pipeline config as a JSON string.
    #[arg(long)]
    config_json: Option<String>,

    /// Height the working image is scaled down to.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_height: Option<u32>,

    /// JPEG quality of the output (1-100).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u8>::new().range(1..=100))]
    jpeg_quality: Option<u8>,

    /// Number of runs for timing.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Print the per-stage diagnostics report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of the report.
    #[arg(long)]
    json: bool,

    /// Write debug rasters of the intermediate stages into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Build a [`PipelineConfig`] from CLI arguments: a JSON file or string
/// if given, the defaults otherwise, then the shortcut flags on top.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let mut config = if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()))?
    } else if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig::default()
    };

    if let Some(max_height) = cli.max_height {
        config = config.with_max_height(max_height);
    }
    if let Some(quality) = cli.jpeg_quality {
        config.jpeg_quality = quality;
    }
    Ok(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    input.with_file_name(format!("{stem}.scan.jpg"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let scanner = match DocumentScanner::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        runs = cli.runs,
        "input loaded"
    );

    if let Some(ref dir) = cli.dump_dir {
        match scanner.process_staged(&image_bytes) {
            Ok(staged) => {
                if let Err(e) = dump::write_all(dir, &staged) {
                    eprintln!("Error writing dumps to {}: {e}", dir.display());
                    return ExitCode::FAILURE;
                }
                eprintln!("Debug rasters written to {}", dir.display());
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut output = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match diagnostics::process_with_diagnostics(&image_bytes, scanner.config(), &StdClock) {
            Ok((jpeg, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else if cli.diagnostics {
                    println!("{}", diagnostics.report());
                }
                if run == 0 {
                    output = jpeg;
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    let Some(jpeg) = output else {
        warn!(path = %cli.image_path.display(), "no document found");
        eprintln!("No document found in {}", cli.image_path.display());
        return ExitCode::from(EXIT_NO_DOCUMENT);
    };

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.image_path));
    match std::fs::write(&out_path, &jpeg) {
        Ok(()) => {
            eprintln!(
                "Document written to {} ({} bytes)",
                out_path.display(),
                jpeg.len(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing {}: {e}", out_path.display());
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| diagnostics::duration_ms(d.total_duration))
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode.duration)),
        ("Preprocess", |d| Some(d.preprocess.duration)),
        ("Detect", |d| Some(d.detect.duration)),
        ("Correct", |d| Some(d.correct.duration)),
        ("Scoring", |d| Some(d.scoring_duration())),
        ("Extract", |d| Some(d.extract.duration)),
        ("Encode", |d| d.encode.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(diagnostics::duration_ms)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
