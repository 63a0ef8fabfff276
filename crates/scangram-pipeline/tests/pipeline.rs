//! Integration tests: run synthetic photographs through the full pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{Rgb, RgbImage};
use scangram_pipeline::{DocumentScanner, PipelineConfig, PipelineError, geometry};

/// PNG of a white page on a black table.
fn document_png(width: u32, height: u32, page: (u32, u32, u32, u32)) -> Vec<u8> {
    let (x0, y0, x1, y1) = page;
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            Rgb([250, 250, 245])
        } else {
            Rgb([10, 10, 10])
        }
    });
    encode_png(&img)
}

fn encode_png(img: &RgbImage) -> Vec<u8> {
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

fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn scanner() -> DocumentScanner {
    DocumentScanner::new(PipelineConfig::default()).unwrap()
}

#[test]
fn blank_image_yields_no_document() {
    let blank = encode_png(&RgbImage::from_pixel(320, 240, Rgb([128, 128, 128])));
    let staged = scanner().process_staged(&blank).unwrap();
    assert!(staged.survivors.is_empty());
    assert!(staged.detection.is_none());
    assert!(staged.rectified.is_none());
    assert_eq!(scanner().process(&blank).unwrap(), None);
}

#[test]
fn clean_quad_yields_rectified_jpeg() {
    let png = document_png(320, 240, (70, 55, 250, 185));
    let scanner = scanner();

    let jpeg = scanner.process(&png).unwrap().expect("document should be found");
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "output must be a JPEG");
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert!(decoded.width() > 0 && decoded.height() > 0);

    let detection = scanner.detect(&png).unwrap().unwrap();
    let [tl, tr, br, bl] = detection.corners;
    for p in detection.corners {
        assert!((0.0..=320.0).contains(&p.x) && (0.0..=240.0).contains(&p.y), "{p:?}");
    }
    assert!(tl.x < tr.x && bl.x < br.x);
    assert!(tl.y < bl.y && tr.y < br.y);
    let area = geometry::polygon_area(&detection.corners);
    assert!(area >= 0.25 * 230.0 * 310.0, "area {area}");
}

#[test]
fn jpeg_photo_yields_rectified_jpeg() {
    let page = RgbImage::from_fn(320, 240, |x, y| {
        if (70..250).contains(&x) && (55..185).contains(&y) {
            Rgb([250, 250, 245])
        } else {
            Rgb([10, 10, 10])
        }
    });
    let jpeg_in = encode_jpeg(&page);
    assert_eq!(&jpeg_in[..2], &[0xFF, 0xD8]);
    let scanner = scanner();

    let detection = scanner.detect(&jpeg_in).unwrap().expect("document should be found");
    let (lo, hi) = geometry::bounding_box(&detection.corners).unwrap();
    assert!(lo.x < 90.0 && hi.x > 230.0, "x {lo:?}..{hi:?}");
    assert!(lo.y < 75.0 && hi.y > 165.0, "y {lo:?}..{hi:?}");

    let jpeg_out = scanner.process(&jpeg_in).unwrap().unwrap();
    assert_eq!(&jpeg_out[..2], &[0xFF, 0xD8]);
}

#[test]
fn staged_candidates_shrink_through_scoring() {
    let png = document_png(320, 240, (70, 55, 250, 185));
    let staged = scanner().process_staged(&png).unwrap();
    assert!(!staged.candidates.is_empty());
    assert!(staged.survivors.len() <= staged.candidates.len());
    assert!(staged.survivors.iter().all(|c| c.polygon.len() == 4));
    assert!(staged.detection.is_some());
}

#[test]
fn corners_are_reported_in_source_space_after_resize() {
    let png = document_png(640, 480, (140, 110, 500, 370));
    let config = PipelineConfig::default().with_max_height(240);
    let scanner = DocumentScanner::new(config).unwrap();

    let detection = scanner.detect(&png).unwrap().unwrap();
    let (lo, hi) = geometry::bounding_box(&detection.corners).unwrap();
    // The padded working image is only 330 px wide.
    assert!(hi.x - lo.x > 340.0, "width {}", hi.x - lo.x);
    assert!(hi.x <= 640.0 && hi.y <= 480.0);
}

#[test]
fn decode_failures_are_typed() {
    let scanner = scanner();
    assert!(matches!(scanner.process(&[]), Err(PipelineError::EmptyInput)));
    assert!(matches!(
        scanner.process(b"definitely not an image"),
        Err(PipelineError::ImageDecode(_))
    ));

    let mut truncated = document_png(64, 48, (10, 10, 50, 40));
    truncated.truncate(truncated.len() / 2);
    assert!(matches!(
        scanner.process(&truncated),
        Err(PipelineError::ImageDecode(_))
    ));
}

#[test]
fn oversized_input_hits_resource_limit() {
    let mut config = PipelineConfig::default();
    config.limits.max_width = 100;
    let scanner = DocumentScanner::new(config).unwrap();
    let png = document_png(320, 240, (70, 55, 250, 185));
    assert!(matches!(
        scanner.process(&png),
        Err(PipelineError::ResourceLimit(_))
    ));
}

#[test]
fn reader_errors_surface_as_io() {
    struct Failing;
    impl std::io::Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disconnected"))
        }
    }
    assert!(matches!(
        scanner().process_reader(Failing),
        Err(PipelineError::Io(_))
    ));
}

#[test]
fn sequential_runs_are_identical() {
    let png = document_png(160, 120, (40, 30, 120, 90));
    let scanner = scanner();
    let first = scanner.process(&png).unwrap();
    for run in 1..100 {
        assert_eq!(scanner.process(&png).unwrap(), first, "run {run}");
    }
}

#[test]
fn concurrent_runs_are_identical() {
    let png = document_png(160, 120, (40, 30, 120, 90));
    let scanner = scanner();
    let expected = scanner.process(&png).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    (0..25)
                        .map(|_| scanner.process(&png).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for output in handle.join().unwrap() {
                assert_eq!(output, expected);
            }
        }
    });
}

#[test]
fn free_function_matches_scanner() {
    let png = document_png(320, 240, (70, 55, 250, 185));
    let config = PipelineConfig::default();
    assert_eq!(
        scangram_pipeline::process(&png, &config).unwrap(),
        scanner().process(&png).unwrap()
    );
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config: PipelineConfig = serde_json::from_str(
        r#"{"scorers": [{"kind": "area"}, {"kind": "vertex_count"}]}"#,
    )
    .unwrap();
    assert!(matches!(
        DocumentScanner::new(config),
        Err(PipelineError::InvalidConfig(_))
    ));
}
