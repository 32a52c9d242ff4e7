//! End-to-end extraction scenarios on synthetic sprites.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hitshape_pipeline::normalize::{centroid, signed_area};
use hitshape_pipeline::{
    ContourTracerKind, Dimensions, ExtractionConfig, ExtractionResult, FailureReason,
    NormalizedShape, Pipeline, Point, RgbaImage, SimplifyStrategy, Winding, extract,
    extract_images, extract_or_fallback, plan_body_with,
};
use image::Rgba;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
const SOLID: Rgba<u8> = Rgba([220, 180, 40, 255]);

fn sprite(width: u32, height: u32, inside: impl Fn(u32, u32) -> bool) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| if inside(x, y) { SOLID } else { CLEAR })
}

fn disc(size: u32, cx: f64, cy: f64, r: f64) -> RgbaImage {
    sprite(size, size, |x, y| {
        (f64::from(x) + 0.5 - cx).hypot(f64::from(y) + 0.5 - cy) < r
    })
}

fn png(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

fn run(img: RgbaImage, config: &ExtractionConfig) -> ExtractionResult {
    extract_images(img, None, config).unwrap()
}

fn extracted(img: RgbaImage) -> NormalizedShape {
    let result = run(img, &ExtractionConfig::default());
    assert!(result.is_ok(), "extraction failed: {:?}", result.reason());
    result.into_shape()
}

fn assert_shape_invariants(shape: &NormalizedShape, config: &ExtractionConfig) {
    let n = shape.vertices.len();
    assert!(n >= config.min_vertices, "{n} vertices");
    assert!(n <= config.max_vertices.max(config.min_vertices), "{n} vertices");
    assert!(shape.winding.matches(signed_area(&shape.vertices)));
    let c = centroid(&shape.vertices);
    assert!(c.distance(Point::ZERO) < 1e-6 * shape.bounding_max().max(1.0), "centroid {c:?}");
    assert!((0.0..=1.0).contains(&shape.x_offset));
    assert!((0.0..=1.0).contains(&shape.y_offset));
}

#[test]
fn solid_square_becomes_a_box() {
    let config = ExtractionConfig::default();
    let shape = extracted(sprite(64, 64, |_, _| true));

    assert_shape_invariants(&shape, &config);
    assert!((4..=8).contains(&shape.vertices.len()), "{:?}", shape.vertices);
    assert!((shape.bounding_width - 64.0).abs() < 2.0, "{}", shape.bounding_width);
    assert!((shape.bounding_height - 64.0).abs() < 2.0, "{}", shape.bounding_height);
    assert!((shape.x_offset - 0.5).abs() < 0.02);
    assert!((shape.y_offset - 0.5).abs() < 0.02);
}

#[test]
fn off_centre_disc_offsets_follow_its_centroid() {
    let shape = extracted(disc(100, 70.0, 70.0, 20.0));

    assert_shape_invariants(&shape, &ExtractionConfig::default());
    assert!((shape.x_offset - 0.70).abs() < 0.05, "{}", shape.x_offset);
    assert!((shape.y_offset - 0.70).abs() < 0.05, "{}", shape.y_offset);
    assert!((shape.bounding_width - 40.0).abs() < 3.0);
    let c = shape.centroid_in_source();
    assert!(c.distance(Point::new(70.0, 70.0)) < 2.0, "{c:?}");
}

#[test]
fn asymmetric_sprite_is_anchored_on_area_centroid() {
    // L-shape: the bounding-box centre is (30, 30); the area centroid is
    // pulled towards the heavy bottom-left corner.
    let shape = extracted(sprite(60, 60, |x, y| x < 20 || y >= 40));
    assert_shape_invariants(&shape, &ExtractionConfig::default());
    assert!(shape.x_offset < 0.45, "{}", shape.x_offset);
    assert!(shape.y_offset > 0.55, "{}", shape.y_offset);
}

#[test]
fn speck_is_ignored_in_favour_of_largest_blob() {
    // 40x50 block (2000 px) plus a five-pixel speck.
    let img = sprite(64, 64, |x, y| {
        let blob = (2..42).contains(&x) && (6..56).contains(&y);
        let speck = x == 58 && (1..6).contains(&y);
        blob || speck
    });

    let selected = Pipeline::new(img.clone(), None, ExtractionConfig::default())
        .unwrap()
        .rasterize()
        .unwrap()
        .binarize()
        .select()
        .unwrap();
    assert_eq!(selected.selection().component_count, 2);

    let shape = extracted(img);
    assert!((shape.bounding_width - 40.0).abs() < 2.0, "{}", shape.bounding_width);
    assert!((shape.bounding_height - 50.0).abs() < 2.0, "{}", shape.bounding_height);
    let c = shape.centroid_in_source();
    assert!(c.distance(Point::new(22.0, 31.0)) < 1.5, "{c:?}");
}

#[test]
fn empty_alpha_falls_back_to_centred_hexagon() {
    let config = ExtractionConfig::default();
    let result = run(RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 0])), &config);

    assert_eq!(result.reason(), Some(FailureReason::NoSolidPixels));
    let shape = result.shape();
    assert_eq!(shape.vertices.len(), 6);
    assert_eq!((shape.x_offset, shape.y_offset), (0.5, 0.5));
    assert_eq!(shape.reason, Some(FailureReason::NoSolidPixels));
    assert_shape_invariants(shape, &config);
}

#[test]
fn failed_wide_sprite_keeps_its_aspect_ratio() {
    let config = ExtractionConfig {
        min_area: 1e9,
        ..ExtractionConfig::default()
    };
    let result = run(RgbaImage::from_pixel(200, 100, SOLID), &config);
    assert_eq!(result.reason(), Some(FailureReason::AreaTooSmall));

    let shape = result.shape();
    assert_eq!(
        shape.source,
        Dimensions {
            width: 200,
            height: 100
        }
    );
    let plan = plan_body_with(shape, &config);
    let size = plan.sprite_size;
    assert!((size.x - 2.0 * size.y).abs() < 1e-9, "{size:?}");
}

#[test]
fn interior_channel_does_not_replace_the_outline() {
    // Solid block with a long 1px serpentine channel cut inside it.
    let channel = |x: u32, y: u32| {
        let row = y % 4 == 0 && (4..=36).contains(&y) && (4..=36).contains(&x);
        let turn_x = if (y / 4) % 2 == 0 { 4 } else { 36 };
        let turn = y % 4 != 0 && (5..36).contains(&y) && x == turn_x;
        row || turn
    };
    let img = sprite(41, 41, |x, y| !channel(x, y));
    for tracer in [ContourTracerKind::MarchingSquares, ContourTracerKind::MooreNeighbor] {
        let config = ExtractionConfig {
            tracer,
            ..ExtractionConfig::default()
        };
        let result = run(img.clone(), &config);
        assert!(result.is_ok(), "{tracer:?}: {:?}", result.reason());
        let shape = result.shape();
        let (w, h) = (shape.bounding_width, shape.bounding_height);
        assert!((w - 41.0).abs() < 2.0 && (h - 41.0).abs() < 2.0, "{tracer:?}: {w}x{h}");
        assert!(signed_area(&shape.vertices).abs() > 1500.0, "{tracer:?}");
    }
}

#[test]
fn single_pixel_image_has_too_short_a_contour() {
    let result = run(sprite(1, 1, |_, _| true), &ExtractionConfig::default());
    assert_eq!(result.reason(), Some(FailureReason::ContourTooShort));
}

#[test]
fn every_pipeline_failure_is_reachable() {
    let square = || sprite(48, 48, |x, y| (8..40).contains(&x) && (8..40).contains(&y));
    let defaults = ExtractionConfig::default();

    let cases: Vec<(FailureReason, ExtractionResult)> = vec![
        (
            FailureReason::ImageLoadFailed,
            extract_or_fallback(b"not a png", None, &defaults),
        ),
        (FailureReason::NoSolidPixels, run(RgbaImage::new(16, 16), &defaults)),
        (
            FailureReason::TooFewSolidPixels,
            run(
                square(),
                &ExtractionConfig {
                    min_solid_pixels: 1_000_000,
                    ..defaults.clone()
                },
            ),
        ),
        (
            FailureReason::NoBoundaryPixel,
            run(
                sprite(8, 8, |x, y| x == 3 && y == 3),
                &ExtractionConfig {
                    tracer: ContourTracerKind::MooreNeighbor,
                    max_upscale: 1.0,
                    min_analysis_dim: 1,
                    min_solid_pixels: 1,
                    ..defaults.clone()
                },
            ),
        ),
        (
            FailureReason::ContourTooShort,
            run(sprite(1, 1, |_, _| true), &defaults),
        ),
        (
            FailureReason::TooFewVertices,
            run(
                square(),
                &ExtractionConfig {
                    min_vertices: 12,
                    ..defaults.clone()
                },
            ),
        ),
        (
            FailureReason::AreaTooSmall,
            run(
                square(),
                &ExtractionConfig {
                    min_area: 1e9,
                    ..defaults.clone()
                },
            ),
        ),
    ];

    for (expected, result) in cases {
        assert_eq!(result.reason(), Some(expected));
        let shape = result.shape();
        assert_eq!(shape.reason, Some(expected));
        assert!(shape.vertices.len() >= 3);
        assert!(signed_area(&shape.vertices).abs() > 0.0);
    }
}

#[test]
fn extraction_is_deterministic() {
    let bytes = png(&disc(80, 33.0, 41.0, 25.0));
    let config = ExtractionConfig::default();
    let first = extract(&bytes, None, &config).unwrap();
    let second = extract(&bytes, None, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn both_windings_and_both_tracers_hold_invariants() {
    let img = disc(90, 40.0, 50.0, 30.0);
    for tracer in [ContourTracerKind::MarchingSquares, ContourTracerKind::MooreNeighbor] {
        for winding in [Winding::Clockwise, Winding::CounterClockwise] {
            let config = ExtractionConfig {
                tracer,
                winding,
                ..ExtractionConfig::default()
            };
            let result = run(img.clone(), &config);
            assert!(result.is_ok(), "{tracer:?} {winding:?}: {:?}", result.reason());
            assert_shape_invariants(result.shape(), &config);
        }
    }
}

#[test]
fn vertex_cap_is_honoured_on_a_spiky_outline() {
    // Twelve-tooth gear.
    let img = sprite(120, 120, |x, y| {
        let dx = f64::from(x) + 0.5 - 60.0;
        let dy = f64::from(y) + 0.5 - 60.0;
        let tooth = if (dy.atan2(dx) * 12.0).sin() > 0.0 { 12.0 } else { 0.0 };
        dx.hypot(dy) < 40.0 + tooth
    });
    let config = ExtractionConfig {
        simplify: SimplifyStrategy::Rdp { epsilon: 0.0 },
        max_vertices: 10,
        ..ExtractionConfig::default()
    };
    let result = run(img, &config);
    assert!(result.is_ok(), "{:?}", result.reason());
    assert_shape_invariants(result.shape(), &config);
}

#[test]
fn resample_strategy_yields_requested_count() {
    let config = ExtractionConfig {
        simplify: SimplifyStrategy::Resample { points: 24 },
        ..ExtractionConfig::default()
    };
    let result = run(disc(64, 32.0, 32.0, 24.0), &config);
    let shape = result.shape();
    assert!(result.is_ok());
    assert!((20..=24).contains(&shape.vertices.len()), "{}", shape.vertices.len());
    assert_shape_invariants(shape, &config);
}

#[test]
fn mask_supplies_the_silhouette() {
    // Opaque texture; the mask carves a disc out of it.
    let texture = RgbaImage::from_pixel(64, 64, SOLID);
    let mask = disc(64, 20.0, 20.0, 12.0);
    let result = extract(&png(&texture), Some(&png(&mask)), &ExtractionConfig::default()).unwrap();
    let shape = result.shape();
    assert!(result.is_ok());
    assert!((shape.bounding_width - 24.0).abs() < 3.0, "{}", shape.bounding_width);
    assert!((shape.x_offset - 20.0 / 64.0).abs() < 0.03);
}
