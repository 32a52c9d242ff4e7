//! hitshape-pipeline: sprite-to-collider extraction (sans-IO).
//!
//! Turns a sprite's alpha channel (or a separate silhouette mask) into a
//! simple polygon suitable for a physics body:
//! rasterize -> binarize -> select component -> trace -> simplify ->
//! normalize on the area centroid.
//!
//! Any step that rejects the input produces a fallback polygon and a
//! [`FailureReason`] instead of an error; only undecodable bytes and an
//! invalid configuration escape as [`PipelineError`]. This crate has **no
//! I/O dependencies**: asset loading and caching live in `hitshape-io`.

pub mod binarize;
pub mod body;
pub mod component;
pub mod config;
pub mod contour;
pub mod diagnostics;
pub mod fallback;
pub mod marching;
pub mod moore;
pub mod normalize;
pub mod pipeline;
pub mod raster;
pub mod simplify;
pub mod types;

pub use body::{
    BodyFactory, BodyPlan, ColliderMode, SpawnedBody, is_simple, plan_body, plan_body_with,
    spawn_body,
};
pub use config::{Connectivity, ExtractionConfig, MaskChannel, ResampleFilter, cache_key};
pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::{
    Clock, ExtractionDiagnostics, StageDiagnostics, StageMetrics, extract_with_diagnostics,
};
pub use fallback::{
    ExtractionResult, FailureReason, FallbackShape, PartialMeta, fallback, fallback_for,
};
pub use normalize::NormalizedShape;
pub use pipeline::{Pipeline, StageFailure};
pub use simplify::SimplifyStrategy;
pub use types::{BoundingBox, Contour, Dimensions, PipelineError, Point, RgbaImage, Winding};

/// Extract a collider from encoded image bytes.
///
/// `mask_bytes`, when given, supplies the silhouette instead of the
/// texture's own alpha.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
/// when either image cannot be decoded, and
/// [`PipelineError::InvalidConfig`] when `config` fails validation.
/// Geometric failures are reported through the returned
/// [`ExtractionResult`].
pub fn extract(
    texture_bytes: &[u8],
    mask_bytes: Option<&[u8]>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PipelineError> {
    let texture = raster::decode(texture_bytes)?;
    let mask = mask_bytes.map(raster::decode).transpose()?;
    extract_images(texture, mask, config)
}

/// Extract a collider from decoded images.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when `config` fails
/// validation.
pub fn extract_images(
    texture: RgbaImage,
    mask: Option<RgbaImage>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PipelineError> {
    Ok(Pipeline::new(texture, mask, config.clone())?.run())
}

/// Like [`extract`], but never fails.
///
/// Undecodable input becomes [`FailureReason::ImageLoadFailed`]. An
/// invalid configuration is logged and replaced by the default one.
#[must_use]
pub fn extract_or_fallback(
    texture_bytes: &[u8],
    mask_bytes: Option<&[u8]>,
    config: &ExtractionConfig,
) -> ExtractionResult {
    let config = match config.validate() {
        Ok(()) => config.clone(),
        Err(err) => {
            tracing::warn!(%err, "invalid extraction config, using defaults");
            ExtractionConfig::default()
        }
    };
    match extract(texture_bytes, mask_bytes, &config) {
        Ok(result) => result,
        Err(err) => {
            tracing::debug!(%err, "image decode failed");
            ExtractionResult::failed(
                FailureReason::ImageLoadFailed,
                PartialMeta::default(),
                &config,
            )
        }
    }
}
