// Criterion benchmarks for the document pipeline on synthetic photographs.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

use scangram_pipeline::{DocumentScanner, PipelineConfig, hough};

/// A slightly skewed white page on a dark background, PNG-encoded.
fn synthetic_document(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (f64::from(x), f64::from(y));
        let (w, h) = (f64::from(width), f64::from(height));
        let inside = fx > 0.2 * w + 0.05 * fy
            && fx < 0.8 * w + 0.05 * fy
            && fy > 0.2 * h
            && fy < 0.85 * h;
        if inside {
            Rgb([240, 238, 230])
        } else {
            Rgb([35, 30, 28])
        }
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    #[allow(clippy::unwrap_used)]
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

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full detect + rectify + encode on a 640x480 page.
fn bench_process(c: &mut Criterion) {
    let png = synthetic_document(640, 480);
    #[allow(clippy::unwrap_used)]
    let scanner = DocumentScanner::new(PipelineConfig::default()).unwrap();

    c.bench_function("process (640x480)", |b| {
        b.iter(|| black_box(scanner.process(black_box(&png))));
    });
}

/// Detection only, with the working image capped at 240 px.
fn bench_detect_downscaled(c: &mut Criterion) {
    let png = synthetic_document(1280, 960);
    #[allow(clippy::unwrap_used)]
    let scanner = DocumentScanner::new(PipelineConfig::default().with_max_height(240)).unwrap();

    c.bench_function("detect (1280x960 -> 240)", |b| {
        b.iter(|| black_box(scanner.detect(black_box(&png))));
    });
}

/// Probabilistic Hough transform over the outline of a square.
fn bench_hough(c: &mut Criterion) {
    let edges = image::GrayImage::from_fn(400, 400, |x, y| {
        let on_x = x == 50 || x == 350;
        let on_y = y == 50 || y == 350;
        let within = (50..=350).contains(&x) && (50..=350).contains(&y);
        image::Luma([if within && (on_x || on_y) { 255 } else { 0 }])
    });
    let params = hough::HoughParams::default();

    c.bench_function("hough segments (400x400 square)", |b| {
        b.iter(|| black_box(hough::detect_segments(black_box(&edges), &params)));
    });
}

criterion_group!(benches, bench_process, bench_detect_downscaled, bench_hough);
criterion_main!(benches);
