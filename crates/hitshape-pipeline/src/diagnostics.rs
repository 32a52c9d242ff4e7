//! Extraction diagnostics: timing and counts for each stage.
//!
//! Permanent instrumentation for tuning thresholds, budgets and
//! simplification on real sprites. [`extract_with_diagnostics`] drives
//! the staged [`Pipeline`](crate::Pipeline) and records every stage it
//! reaches; stages after a failure stay `None`.
//!
//! Time is read through the [`Clock`] trait so the crate stays free of
//! platform timers; the bench CLI supplies a `std::time::Instant` clock.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::fallback::ExtractionResult;
use crate::normalize::NormalizedShape;
use crate::pipeline::{Pending, Pipeline, StageFailure, normalize_metrics};
use crate::types::{PipelineError, RgbaImage};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Crop and resample.
    Rasterize {
        /// Solid-region crop width in source pixels.
        crop_width: u32,
        /// Solid-region crop height in source pixels.
        crop_height: u32,
        /// Analysis grid width.
        grid_width: u32,
        /// Analysis grid height.
        grid_height: u32,
        /// Horizontal analysis pixels per source pixel.
        scale_x: f64,
        /// Vertical analysis pixels per source pixel.
        scale_y: f64,
    },
    /// Threshold and morphology.
    Binarize {
        /// Alpha threshold.
        threshold: u8,
        /// Solid pixels after morphology.
        solid_pixels: u64,
        /// Grid pixel count.
        total_pixels: u64,
        /// Dilation passes.
        dilate_iterations: u8,
        /// Erosion passes.
        erode_iterations: u8,
    },
    /// Component selection.
    Select {
        /// Components found.
        component_count: usize,
        /// Pixels in the selected component.
        selected_pixel_count: u64,
        /// Selected pixels over bounding-box area.
        solidity: f64,
    },
    /// Boundary tracing.
    Trace {
        /// Tracer used.
        tracer: String,
        /// Points in the traced contour.
        point_count: usize,
    },
    /// Simplification.
    Simplify {
        /// Strategy used.
        strategy: String,
        /// Points before simplification.
        points_before: usize,
        /// Points after dedupe and cap.
        points_after: usize,
    },
    /// Centroid normalization.
    Normalize {
        /// Output vertex count.
        vertex_count: usize,
        /// Signed area in source pixels squared.
        area: f64,
        /// Horizontal sprite offset.
        x_offset: f64,
        /// Vertical sprite offset.
        y_offset: f64,
    },
}

/// Diagnostics collected from one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDiagnostics {
    /// Crop and resample.
    pub rasterize: Option<StageDiagnostics>,
    /// Threshold and morphology.
    pub binarize: Option<StageDiagnostics>,
    /// Component selection.
    pub select: Option<StageDiagnostics>,
    /// Boundary tracing.
    pub trace: Option<StageDiagnostics>,
    /// Simplification.
    pub simplify: Option<StageDiagnostics>,
    /// Centroid normalization.
    pub normalize: Option<StageDiagnostics>,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// `"ok"` or the failure reason.
    pub outcome: String,
}

impl ExtractionDiagnostics {
    /// The stages that ran, in order, with display names.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        [
            ("Rasterize", &self.rasterize),
            ("Binarize", &self.binarize),
            ("Select Component", &self.select),
            ("Trace", &self.trace),
            ("Simplify", &self.simplify),
            ("Normalize", &self.normalize),
        ]
        .into_iter()
        .filter_map(|(name, diag)| diag.as_ref().map(|d| (name, d)))
        .collect()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Extraction Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Outcome: {}", self.outcome));
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
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Rasterize {
            crop_width,
            crop_height,
            grid_width,
            grid_height,
            scale_x,
            ..
        } => format!(
            "crop {crop_width}x{crop_height} -> grid {grid_width}x{grid_height} (x{scale_x:.2})"
        ),
        StageMetrics::Binarize {
            threshold,
            solid_pixels,
            total_pixels,
            dilate_iterations,
            erode_iterations,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let fill = if *total_pixels > 0 {
                *solid_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "alpha>{threshold} solid={solid_pixels} ({fill:.1}%) \
                 dilate={dilate_iterations} erode={erode_iterations}"
            )
        }
        StageMetrics::Select {
            component_count,
            selected_pixel_count,
            solidity,
        } => format!(
            "{component_count} components, kept {selected_pixel_count} px \
             (solidity {solidity:.2})"
        ),
        StageMetrics::Trace { tracer, point_count } => format!("{tracer} {point_count} pts"),
        StageMetrics::Simplify {
            strategy,
            points_before,
            points_after,
        } => format!("{strategy} {points_before}->{points_after} pts"),
        StageMetrics::Normalize {
            vertex_count,
            area,
            x_offset,
            y_offset,
        } => format!("{vertex_count} verts, area={area:.1} offset=({x_offset:.3}, {y_offset:.3})"),
    }
}

/// Run the staged pipeline, timing every stage it reaches.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when `config` fails
/// validation. Geometric failures are reported in the result.
pub fn extract_with_diagnostics<C: Clock>(
    texture: RgbaImage,
    mask: Option<RgbaImage>,
    config: &ExtractionConfig,
    clock: &C,
) -> Result<(ExtractionResult, ExtractionDiagnostics), PipelineError> {
    let total_start = clock.now();
    let mut diag = ExtractionDiagnostics::default();

    let pending = Pipeline::new(texture, mask, config.clone())?;
    let outcome = run_stages(pending, clock, &mut diag);

    let result = match outcome {
        Ok(shape) => ExtractionResult::Extracted(shape),
        Err(failure) => ExtractionResult::failed(failure.reason, failure.partial, config),
    };
    diag.total_duration = clock.elapsed(&total_start);
    diag.outcome = result
        .reason()
        .map_or_else(|| "ok".to_owned(), |reason| reason.to_string());
    Ok((result, diag))
}

fn run_stages<C: Clock>(
    pending: Pending,
    clock: &C,
    diag: &mut ExtractionDiagnostics,
) -> Result<NormalizedShape, StageFailure> {
    let start = clock.now();
    let rasterized = pending.rasterize()?;
    diag.rasterize = Some(stage(clock, &start, rasterized.metrics()));

    let start = clock.now();
    let binarized = rasterized.binarize();
    diag.binarize = Some(stage(clock, &start, binarized.metrics()));

    let start = clock.now();
    let selected = binarized.select()?;
    diag.select = Some(stage(clock, &start, selected.metrics()));

    let start = clock.now();
    let traced = selected.trace()?;
    diag.trace = Some(stage(clock, &start, traced.metrics()));

    let start = clock.now();
    let simplified = traced.simplify()?;
    diag.simplify = Some(stage(clock, &start, simplified.metrics()));

    let start = clock.now();
    let shape = simplified.normalize()?;
    diag.normalize = Some(stage(clock, &start, normalize_metrics(&shape)));
    Ok(shape)
}

fn stage<C: Clock>(clock: &C, start: &C::Instant, metrics: StageMetrics) -> StageDiagnostics {
    StageDiagnostics {
        duration: clock.elapsed(start),
        metrics,
    }
}
