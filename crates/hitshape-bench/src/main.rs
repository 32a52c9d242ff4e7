//! hitshape-bench: CLI tool for collider extraction experimentation and
//! diagnostics.
//!
//! Runs the extraction pipeline on a sprite with configurable parameters,
//! printing per-stage diagnostics, the outcome, and the body plan the
//! physics adapter would build. Useful for:
//!
//! - Tuning the alpha threshold, analysis budget and simplification
//! - Comparing the marching-squares and Moore-neighbor tracers
//! - Checking that a sprite's collider lines up with its art (`--svg`)
//! - Measuring per-stage durations on large sprites
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hitshape-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hitshape_pipeline::diagnostics::{Clock, ExtractionDiagnostics};
use hitshape_pipeline::{
    ColliderMode, Connectivity, ContourTracerKind, ExtractionConfig, ExtractionResult,
    FallbackShape, ResampleFilter, RgbaImage, SimplifyStrategy, Winding,
};
use tracing_subscriber::EnvFilter;

/// Collider extraction experimentation and diagnostics for hitshape.
///
/// Extracts a collision polygon from a sprite's alpha channel with
/// configurable parameters and prints per-stage timing and counts.
#[derive(Parser)]
#[command(name = "hitshape-bench", version)]
struct Cli {
    /// Path to the sprite (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Separate silhouette mask; replaces the sprite's own alpha.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Use the mask's luminance instead of its alpha.
    #[arg(long)]
    mask_luma: bool,

    /// Coverage above this value is solid.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Analysis budget for the crop's longer side, in pixels.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_ANALYSIS_MAX)]
    analysis_max: u32,

    /// Floor for the crop's shorter side, in analysis pixels.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MIN_ANALYSIS_DIM)]
    min_analysis_dim: u32,

    /// Upper clamp on the analysis scale factor.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MAX_UPSCALE)]
    max_upscale: f64,

    /// Resampling filter for the analysis grid.
    #[arg(long, value_enum, default_value_t = Filter::Triangle)]
    filter: Filter,

    /// Dilation passes on the binary grid.
    #[arg(long, default_value_t = 0)]
    dilate: u8,

    /// Erosion passes on the binary grid.
    #[arg(long, default_value_t = 0)]
    erode: u8,

    /// Treat diagonal neighbours as connected.
    #[arg(long)]
    eight_connected: bool,

    /// Smallest acceptable component, in analysis pixels.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MIN_SOLID_PIXELS)]
    min_solid_pixels: u32,

    /// Boundary tracer.
    #[arg(long, value_enum, default_value_t = Tracer::Marching)]
    tracer: Tracer,

    /// Shortest acceptable contour, in points.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MIN_CONTOUR_LENGTH)]
    min_contour_length: usize,

    /// RDP tolerance in analysis pixels.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_SIMPLIFY_EPSILON)]
    epsilon: f64,

    /// Resample to this many evenly spaced points instead of RDP.
    #[arg(long, conflicts_with = "epsilon")]
    resample: Option<usize>,

    /// Output vertex cap.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MAX_VERTICES)]
    max_vertices: usize,

    /// Output vertex floor.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MIN_VERTICES)]
    min_vertices: usize,

    /// Minimum polygon area in source pixels squared.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_MIN_AREA)]
    min_area: f64,

    /// Emit counter-clockwise (positive-area) polygons.
    #[arg(long)]
    ccw: bool,

    /// Shape returned when extraction fails.
    #[arg(long, value_enum, default_value_t = Fallback::Hexagon)]
    fallback: Fallback,

    /// On-screen size for the body plan.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_TARGET_SIZE)]
    target_size: f64,

    /// Collider shrink factor for the body plan.
    #[arg(long, default_value_t = ExtractionConfig::DEFAULT_HIT_INSET)]
    hit_inset: f64,

    /// Plan the body from the polygon's convex hull.
    #[arg(long)]
    convex_hull: bool,

    /// Write an SVG preview of the collider to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Output diagnostics and result as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// Full extraction config as a JSON string.
    ///
    /// When provided, all other extraction parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Boundary tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// Marching squares over the binary grid.
    Marching,
    /// Moore-neighbor boundary following.
    Moore,
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

/// Fallback shape selection.
#[derive(Clone, Copy, ValueEnum)]
enum Fallback {
    /// Six-sided rounded box.
    Hexagon,
    /// Square.
    Rectangle,
}

/// Build an [`ExtractionConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ExtractionConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ExtractionConfig {
            alpha_threshold: cli.alpha_threshold,
            mask_channel: if cli.mask_luma {
                hitshape_pipeline::MaskChannel::Luma
            } else {
                hitshape_pipeline::MaskChannel::Alpha
            },
            analysis_max: cli.analysis_max,
            min_analysis_dim: cli.min_analysis_dim,
            max_upscale: cli.max_upscale,
            resample_filter: match cli.filter {
                Filter::Nearest => ResampleFilter::Nearest,
                Filter::Triangle => ResampleFilter::Triangle,
                Filter::CatmullRom => ResampleFilter::CatmullRom,
                Filter::Lanczos3 => ResampleFilter::Lanczos3,
            },
            dilate_iterations: cli.dilate,
            erode_iterations: cli.erode,
            connectivity: if cli.eight_connected {
                Connectivity::Eight
            } else {
                Connectivity::Four
            },
            min_solid_pixels: cli.min_solid_pixels,
            tracer: match cli.tracer {
                Tracer::Marching => ContourTracerKind::MarchingSquares,
                Tracer::Moore => ContourTracerKind::MooreNeighbor,
            },
            min_contour_length: cli.min_contour_length,
            simplify: cli.resample.map_or(
                SimplifyStrategy::Rdp { epsilon: cli.epsilon },
                |points| SimplifyStrategy::Resample { points },
            ),
            max_vertices: cli.max_vertices,
            min_vertices: cli.min_vertices,
            min_area: cli.min_area,
            winding: if cli.ccw {
                Winding::CounterClockwise
            } else {
                Winding::Clockwise
            },
            fallback_shape: match cli.fallback {
                Fallback::Hexagon => FallbackShape::Hexagon,
                Fallback::Rectangle => FallbackShape::Rectangle,
            },
            target_size: cli.target_size,
            hit_inset: cli.hit_inset,
            collider: if cli.convex_hull {
                ColliderMode::ConvexHull
            } else {
                ColliderMode::Polygon
            },
            ..ExtractionConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Read and decode an image file.
fn load_image(path: &Path) -> Result<RgbaImage, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    hitshape_pipeline::raster::decode(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let texture = match load_image(&cli.image_path) {
        Ok(img) => img,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let mask = match cli.mask.as_deref().map(load_image).transpose() {
        Ok(mask) => mask,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        texture.width(),
        texture.height(),
    );
    if let Some(ref path) = cli.mask {
        eprintln!("Mask: {}", path.display());
    }
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, diagnostics) = match hitshape_pipeline::extract_with_diagnostics(
            texture.clone(),
            mask.clone(),
            &config,
            &StdClock,
        ) {
            Ok(out) => out,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            let doc = serde_json::json!({
                "diagnostics": diagnostics,
                "result": result,
            });
            match serde_json::to_string_pretty(&doc) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
            println!();
            print_outcome(&result, &config);
        }

        // Write SVG on the first run only.
        if run == 0
            && let Some(ref svg_path) = cli.svg
        {
            write_svg(svg_path, &cli.image_path, &result, &config);
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Print the shape summary and the body plan built from it.
fn print_outcome(result: &ExtractionResult, config: &ExtractionConfig) {
    let shape = result.shape();
    match result.reason() {
        None => println!("Extracted {} vertices", shape.vertices.len()),
        Some(reason) => println!("Fallback ({reason}): {} vertices", shape.vertices.len()),
    }
    println!(
        "Bounding box: {:.2} x {:.2} px, solidity {:.3}",
        shape.bounding_width, shape.bounding_height, shape.solidity,
    );
    println!(
        "Sprite offset: ({:.4}, {:.4}), centroid at ({:.2}, {:.2}) px",
        shape.x_offset,
        shape.y_offset,
        shape.centroid_in_source().x,
        shape.centroid_in_source().y,
    );

    let plan = hitshape_pipeline::plan_body_with(shape, config);
    let (lo, hi) = plan.collider_bounds();
    println!();
    println!("Body plan ({:?}, target {} px)", plan.mode, config.target_size);
    println!("  sprite scale:  {:.4}", plan.sprite_scale);
    println!("  sprite size:   {:.2} x {:.2}", plan.sprite_size.x, plan.sprite_size.y);
    println!("  render offset: ({:.2}, {:.2})", plan.render_offset.x, plan.render_offset.y);
    println!(
        "  collider:      {} vertices, {:.2} x {:.2}, simple={}",
        plan.vertices.len(),
        hi.x - lo.x,
        hi.y - lo.y,
        hitshape_pipeline::is_simple(&plan.vertices),
    );
}

fn write_svg(
    svg_path: &Path,
    image_path: &Path,
    result: &ExtractionResult,
    config: &ExtractionConfig,
) {
    let title = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bench");
    let desc = result
        .reason()
        .map_or_else(|| "extracted".to_owned(), |reason| format!("fallback: {reason}"));
    let config_json = serde_json::to_string(config).ok();
    let metadata = hitshape_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let svg = hitshape_export::to_svg(result.shape(), &metadata);
    match std::fs::write(svg_path, &svg) {
        Ok(()) => {
            eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
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
type StageExtractor = fn(&ExtractionDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[ExtractionDiagnostics]) {
    println!();
    println!("Summary ({} runs)\n{}", all_diagnostics.len(), "=".repeat(60));

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Rasterize", |d| d.rasterize.as_ref().map(|s| s.duration)),
        ("Binarize", |d| d.binarize.as_ref().map(|s| s.duration)),
        ("Select Component", |d| d.select.as_ref().map(|s| s.duration)),
        ("Trace", |d| d.trace.as_ref().map(|s| s.duration)),
        ("Simplify", |d| d.simplify.as_ref().map(|s| s.duration)),
        ("Normalize", |d| d.normalize.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
