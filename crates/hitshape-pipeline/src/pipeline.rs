//! Staged extraction: advance one stage at a time, inspecting each
//! intermediate before continuing.
//!
//! ```rust
//! # use hitshape_pipeline::{ExtractionConfig, Pipeline, PipelineError, RgbaImage};
//! # fn run(texture: RgbaImage) -> Result<(), PipelineError> {
//! let pending = Pipeline::new(texture, None, ExtractionConfig::default())?;
//! let outcome = pending
//!     .rasterize()
//!     .map(|r| r.binarize())
//!     .and_then(|b| b.select())
//!     .and_then(|s| s.trace())
//!     .and_then(|t| t.simplify())
//!     .and_then(|s| s.normalize());
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state. Stages
//! that can reject the input return `Result<_, StageFailure>`; the
//! failure carries the [`FailureReason`] and whatever metadata the
//! pipeline had gathered. [`Pending::run`] chains every stage and turns
//! a failure into the configured fallback.
//!
//! All stages are synchronous and allocate their buffers fresh; nothing
//! is shared between runs.

use crate::binarize::PixelGrid;
use crate::component::Selection;
use crate::config::ExtractionConfig;
use crate::contour::ContourTracer;
use crate::diagnostics::StageMetrics;
use crate::fallback::{ExtractionResult, FailureReason, PartialMeta};
use crate::normalize::{NormalizedShape, signed_area};
use crate::raster::AnalysisFrame;
use crate::types::{Contour, Dimensions, PipelineError, RgbaImage};

/// A stage rejected the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct StageFailure {
    /// Why the stage rejected the input.
    pub reason: FailureReason,
    /// What was learned before the rejection.
    pub partial: PartialMeta,
}

impl StageFailure {
    const fn new(reason: FailureReason, partial: PartialMeta) -> Self {
        Self { reason, partial }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing.
#[must_use = "pipeline stages are consumed by advancing; call .rasterize() to continue"]
pub struct Pending {
    config: ExtractionConfig,
    texture: RgbaImage,
    mask: Option<RgbaImage>,
}

impl Pending {
    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Crop to the solid region and resample it to the analysis grid.
    ///
    /// # Errors
    ///
    /// [`FailureReason::NoSolidPixels`] when no coverage value is above
    /// the threshold.
    pub fn rasterize(self) -> Result<Rasterized, StageFailure> {
        let source = Dimensions {
            width: self.texture.width(),
            height: self.texture.height(),
        };
        let mut partial = PartialMeta {
            source: Some(source),
            ..PartialMeta::default()
        };

        let coverage = crate::raster::coverage(
            &self.texture,
            self.mask.as_ref(),
            self.config.mask_channel,
        );
        let Some(crop) = crate::raster::solid_bounds(&coverage, self.config.alpha_threshold) else {
            return Err(StageFailure::new(FailureReason::NoSolidPixels, partial));
        };

        let scale = crate::raster::analysis_scale(crop.dimensions(), &self.config);
        let grid = crate::raster::analysis_dimensions(crop.dimensions(), scale);
        let buffer =
            crate::raster::rasterize_crop(&coverage, crop, grid, self.config.resample_filter);
        let frame = AnalysisFrame::new(source, crop, grid);

        partial.crop = Some(crop);
        partial.grid = Some(grid);
        tracing::debug!(?crop, ?grid, scale, "rasterized");

        Ok(Rasterized {
            config: self.config,
            frame,
            buffer,
            partial,
        })
    }

    /// Run every remaining stage, substituting the fallback on failure.
    pub fn run(self) -> ExtractionResult {
        let config = self.config.clone();
        let outcome = self
            .rasterize()
            .map(Rasterized::binarize)
            .and_then(Binarized::select)
            .and_then(Selected::trace)
            .and_then(Traced::simplify)
            .and_then(Simplified::normalize);
        match outcome {
            Ok(shape) => ExtractionResult::Extracted(shape),
            Err(failure) => ExtractionResult::failed(failure.reason, failure.partial, &config),
        }
    }
}

// ───────────────────────── Stage 1: Rasterized ───────────────────────

/// Pipeline state after rasterizing the crop to the analysis grid.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Rasterized {
    config: ExtractionConfig,
    frame: AnalysisFrame,
    buffer: RgbaImage,
    partial: PartialMeta,
}

impl Rasterized {
    /// The analysis buffer; alpha carries coverage.
    #[must_use]
    pub const fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Grid-to-source mapping.
    #[must_use]
    pub const fn frame(&self) -> &AnalysisFrame {
        &self.frame
    }

    /// Metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Rasterize {
            crop_width: self.frame.crop.width,
            crop_height: self.frame.crop.height,
            grid_width: self.frame.grid.width,
            grid_height: self.frame.grid.height,
            scale_x: self.frame.scale_x,
            scale_y: self.frame.scale_y,
        }
    }

    /// Threshold the buffer and apply the configured morphology.
    ///
    /// With morphology enabled the grid is padded first, so dilation can
    /// grow past the crop edge and erosion sees empty space beyond it.
    pub fn binarize(self) -> Binarized {
        let grid = crate::binarize::binarize(&self.buffer, self.config.alpha_threshold);
        let margin = self.config.dilate_iterations.max(self.config.erode_iterations);

        let (grid, frame) = if margin == 0 {
            (grid, self.frame)
        } else {
            let padded = crate::binarize::pad(&grid, u32::from(margin));
            let grid = if self.config.dilate_iterations > 0 {
                crate::binarize::dilate(&padded, self.config.dilate_iterations)
            } else {
                crate::binarize::erode(&padded, self.config.erode_iterations)
            };
            let m = f64::from(margin);
            (grid, self.frame.offset(-m, -m))
        };

        Binarized {
            config: self.config,
            frame,
            grid,
            partial: self.partial,
        }
    }
}

// ───────────────────────── Stage 2: Binarized ────────────────────────

/// Pipeline state after binarization and morphology.
#[must_use = "pipeline stages are consumed by advancing; call .select() to continue"]
pub struct Binarized {
    config: ExtractionConfig,
    frame: AnalysisFrame,
    grid: PixelGrid,
    partial: PartialMeta,
}

impl Binarized {
    /// The binary grid.
    #[must_use]
    pub const fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    /// Metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Binarize {
            threshold: self.config.alpha_threshold,
            solid_pixels: self.grid.solid_count(),
            total_pixels: u64::from(self.grid.width()) * u64::from(self.grid.height()),
            dilate_iterations: self.config.dilate_iterations,
            erode_iterations: self.config.erode_iterations,
        }
    }

    /// Keep only the largest connected component.
    ///
    /// # Errors
    ///
    /// - [`FailureReason::NoSolidPixels`] when the grid is empty (erosion
    ///   can remove everything).
    /// - [`FailureReason::TooFewSolidPixels`] when the largest component
    ///   is below `min_solid_pixels`.
    pub fn select(self) -> Result<Selected, StageFailure> {
        let mut partial = self.partial;
        let Some(selection) =
            crate::component::select_largest(&self.grid, self.config.connectivity)
        else {
            return Err(StageFailure::new(FailureReason::NoSolidPixels, partial));
        };

        partial.component_count = selection.component_count;
        partial.selected_pixel_count = selection.selected_pixel_count;
        if selection.selected_pixel_count < u64::from(self.config.min_solid_pixels) {
            return Err(StageFailure::new(FailureReason::TooFewSolidPixels, partial));
        }

        let frame = self
            .frame
            .offset(f64::from(selection.bounds.x), f64::from(selection.bounds.y));
        Ok(Selected {
            config: self.config,
            frame,
            selection,
            partial,
        })
    }
}

// ───────────────────────── Stage 3: Selected ─────────────────────────

/// Pipeline state after component selection.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
pub struct Selected {
    config: ExtractionConfig,
    frame: AnalysisFrame,
    selection: Selection,
    partial: PartialMeta,
}

impl Selected {
    /// The selected component and its statistics.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Select {
            component_count: self.selection.component_count,
            selected_pixel_count: self.selection.selected_pixel_count,
            solidity: self.selection.solidity(),
        }
    }

    /// Trace the outer boundary of the selected component.
    ///
    /// # Errors
    ///
    /// - [`FailureReason::NoBoundaryPixel`] when the tracer finds
    ///   nothing to follow.
    /// - [`FailureReason::ContourTooShort`] when the contour has fewer
    ///   than `min_contour_length` points.
    pub fn trace(self) -> Result<Traced, StageFailure> {
        let mut partial = self.partial;
        let Some(contour) = self
            .config
            .tracer
            .trace(&self.selection.grid, self.config.connectivity)
        else {
            return Err(StageFailure::new(FailureReason::NoBoundaryPixel, partial));
        };

        partial.contour_length = contour.len();
        if contour.len() < self.config.min_contour_length {
            return Err(StageFailure::new(FailureReason::ContourTooShort, partial));
        }

        Ok(Traced {
            solidity: self.selection.solidity(),
            config: self.config,
            frame: self.frame,
            contour,
            partial,
        })
    }
}

// ───────────────────────── Stage 4: Traced ───────────────────────────

/// Pipeline state after boundary tracing.
#[must_use = "pipeline stages are consumed by advancing; call .simplify() to continue"]
pub struct Traced {
    config: ExtractionConfig,
    frame: AnalysisFrame,
    contour: Contour,
    solidity: f64,
    partial: PartialMeta,
}

impl Traced {
    /// The traced contour in grid coordinates.
    #[must_use]
    pub const fn contour(&self) -> &Contour {
        &self.contour
    }

    /// Metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Trace {
            tracer: format!("{:?}", self.config.tracer),
            point_count: self.contour.len(),
        }
    }

    /// Simplify and cap the contour.
    ///
    /// # Errors
    ///
    /// [`FailureReason::TooFewVertices`] when fewer than `min_vertices`
    /// points remain.
    pub fn simplify(self) -> Result<Simplified, StageFailure> {
        let mut partial = self.partial;
        let polygon = crate::simplify::simplify(
            &self.contour,
            self.config.simplify,
            self.config.max_vertices,
        );

        partial.vertex_count = polygon.len();
        if polygon.len() < self.config.min_vertices {
            return Err(StageFailure::new(FailureReason::TooFewVertices, partial));
        }

        Ok(Simplified {
            config: self.config,
            frame: self.frame,
            traced_len: self.contour.len(),
            polygon,
            solidity: self.solidity,
            partial,
        })
    }
}

// ───────────────────────── Stage 5: Simplified ───────────────────────

/// Pipeline state after simplification.
#[must_use = "pipeline stages are consumed by advancing; call .normalize() to finish"]
pub struct Simplified {
    config: ExtractionConfig,
    frame: AnalysisFrame,
    traced_len: usize,
    polygon: Contour,
    solidity: f64,
    partial: PartialMeta,
}

impl Simplified {
    /// The simplified polygon in grid coordinates.
    #[must_use]
    pub const fn polygon(&self) -> &Contour {
        &self.polygon
    }

    /// Metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Simplify {
            strategy: format!("{:?}", self.config.simplify),
            points_before: self.traced_len,
            points_after: self.polygon.len(),
        }
    }

    /// Map back to source pixels and centre on the area centroid.
    ///
    /// # Errors
    ///
    /// [`FailureReason::TooFewVertices`] or [`FailureReason::AreaTooSmall`]
    /// from [`normalize`](crate::normalize::normalize).
    pub fn normalize(self) -> Result<NormalizedShape, StageFailure> {
        crate::normalize::normalize(&self.polygon, &self.frame, self.solidity, &self.config)
            .map_err(|reason| StageFailure::new(reason, self.partial))
    }
}

/// Metrics for a finished shape.
#[must_use]
pub fn normalize_metrics(shape: &NormalizedShape) -> StageMetrics {
    StageMetrics::Normalize {
        vertex_count: shape.vertices.len(),
        area: signed_area(&shape.vertices),
        x_offset: shape.x_offset,
        y_offset: shape.y_offset,
    }
}

/// Entry point for staged extraction.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Validate `config` and store the inputs. No processing happens
    /// until [`Pending::rasterize`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidConfig`] when `config` fails validation.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        texture: RgbaImage,
        mask: Option<RgbaImage>,
        config: ExtractionConfig,
    ) -> Result<Pending, PipelineError> {
        config.validate()?;
        Ok(Pending {
            config,
            texture,
            mask,
        })
    }
}
