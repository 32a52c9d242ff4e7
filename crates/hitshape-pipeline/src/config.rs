//! Extraction configuration.
//!
//! Every tunable of the pipeline lives in [`ExtractionConfig`]. The
//! struct is validated once by [`ExtractionConfig::validate`] at the
//! pipeline entry point; stages read fields directly and never apply
//! their own defaults.

use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::body::ColliderMode;
use crate::contour::ContourTracerKind;
use crate::fallback::FallbackShape;
use crate::simplify::SimplifyStrategy;
use crate::types::{PipelineError, Winding};

/// Which channel of a dedicated silhouette mask carries coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskChannel {
    /// Use the mask's alpha channel.
    #[default]
    Alpha,
    /// Use the mask's luminance (white = solid). For opaque
    /// black-and-white silhouettes.
    Luma,
}

/// Resampling filter used when scaling the cropped region to the
/// analysis grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    /// Nearest-neighbor: blocky, keeps hard alpha edges.
    Nearest,
    /// Bilinear interpolation: smooth edges on up-sampling.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    #[must_use]
    pub const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Pixel adjacency used by the component selector.
///
/// Marching squares resolves its two saddle cases with the same rule so
/// that the traced outline agrees with the selected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge-sharing neighbors only.
    #[default]
    Four,
    /// Edge- and corner-sharing neighbors.
    Eight,
}

/// Configuration for collider extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// A pixel is solid iff its coverage is strictly greater than this.
    pub alpha_threshold: u8,

    /// Channel of the silhouette mask that carries coverage. Ignored when
    /// no mask is supplied (the texture alpha is used).
    pub mask_channel: MaskChannel,

    /// Analysis budget: the cropped region's longer side is scaled to
    /// this many analysis pixels (subject to `max_upscale`).
    pub analysis_max: u32,

    /// The cropped region's shorter side is never scaled below this many
    /// analysis pixels (subject to `max_upscale`).
    pub min_analysis_dim: u32,

    /// Upper clamp for the analysis scale factor.
    pub max_upscale: f64,

    /// Filter used to resample the cropped region.
    pub resample_filter: ResampleFilter,

    /// Number of 3×3 dilation passes applied to the binary grid.
    pub dilate_iterations: u8,

    /// Number of 3×3 erosion passes applied to the binary grid.
    /// Mutually exclusive with `dilate_iterations`.
    pub erode_iterations: u8,

    /// Pixel adjacency for component selection.
    pub connectivity: Connectivity,

    /// Smallest acceptable selected component, in analysis pixels.
    pub min_solid_pixels: u32,

    /// Boundary tracing algorithm.
    pub tracer: ContourTracerKind,

    /// Shortest acceptable traced contour, in points.
    pub min_contour_length: usize,

    /// Simplification strategy (epsilon in analysis pixels).
    pub simplify: SimplifyStrategy,

    /// Output vertex cap.
    pub max_vertices: usize,

    /// Output vertex floor; fewer vertices is a failed extraction.
    pub min_vertices: usize,

    /// Minimum polygon area in source pixels squared.
    pub min_area: f64,

    /// Winding convention of the output polygon.
    pub winding: Winding,

    /// Polygon returned when extraction fails.
    pub fallback_shape: FallbackShape,

    /// Bounding size of the fallback polygon, in source pixels.
    pub fallback_size: f64,

    /// On-screen size the body adapter scales the collider to.
    pub target_size: f64,

    /// Collider shrink factor in `(0, 1]`.
    pub hit_inset: f64,

    /// How the body adapter hands the polygon to the physics engine.
    pub collider: ColliderMode,
}

impl ExtractionConfig {
    /// Default alpha threshold.
    pub const DEFAULT_ALPHA_THRESHOLD: u8 = 8;
    /// Default analysis budget in pixels.
    pub const DEFAULT_ANALYSIS_MAX: u32 = 256;
    /// Default minimum analysis size in pixels.
    pub const DEFAULT_MIN_ANALYSIS_DIM: u32 = 16;
    /// Default upper clamp for the analysis scale factor.
    pub const DEFAULT_MAX_UPSCALE: f64 = 4.0;
    /// Default resampling filter.
    pub const DEFAULT_RESAMPLE_FILTER: ResampleFilter = ResampleFilter::Triangle;
    /// Default minimum component size in analysis pixels.
    pub const DEFAULT_MIN_SOLID_PIXELS: u32 = 12;
    /// Default minimum contour length in points.
    pub const DEFAULT_MIN_CONTOUR_LENGTH: usize = 24;
    /// Default RDP tolerance in analysis pixels.
    pub const DEFAULT_SIMPLIFY_EPSILON: f64 = 1.5;
    /// Default output vertex cap.
    pub const DEFAULT_MAX_VERTICES: usize = 96;
    /// Default output vertex floor.
    pub const DEFAULT_MIN_VERTICES: usize = 4;
    /// Default minimum polygon area in source pixels squared.
    pub const DEFAULT_MIN_AREA: f64 = 4.0;
    /// Default fallback size in source pixels.
    pub const DEFAULT_FALLBACK_SIZE: f64 = 64.0;
    /// Default on-screen target size.
    pub const DEFAULT_TARGET_SIZE: f64 = 64.0;
    /// Default collider shrink factor.
    pub const DEFAULT_HIT_INSET: f64 = 0.97;

    /// Largest accepted `analysis_max`.
    pub const MAX_ANALYSIS_MAX: u32 = 2048;
    /// Largest accepted `max_upscale`.
    pub const MAX_UPSCALE_LIMIT: f64 = 12.0;
    /// Largest accepted morphology iteration count.
    pub const MAX_MORPHOLOGY_ITERATIONS: u8 = 4;

    /// Check every field against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.alpha_threshold == u8::MAX {
            return invalid("alpha_threshold must be below 255".into());
        }
        if !(16..=Self::MAX_ANALYSIS_MAX).contains(&self.analysis_max) {
            return invalid(format!(
                "analysis_max must be in 16..={}, got {}",
                Self::MAX_ANALYSIS_MAX,
                self.analysis_max
            ));
        }
        if self.min_analysis_dim == 0 || self.min_analysis_dim > self.analysis_max {
            return invalid(format!(
                "min_analysis_dim must be in 1..={}, got {}",
                self.analysis_max, self.min_analysis_dim
            ));
        }
        if !(0.1..=Self::MAX_UPSCALE_LIMIT).contains(&self.max_upscale) {
            return invalid(format!(
                "max_upscale must be in 0.1..={}, got {}",
                Self::MAX_UPSCALE_LIMIT,
                self.max_upscale
            ));
        }
        if self.dilate_iterations > Self::MAX_MORPHOLOGY_ITERATIONS
            || self.erode_iterations > Self::MAX_MORPHOLOGY_ITERATIONS
        {
            return invalid(format!(
                "morphology iterations must be at most {}",
                Self::MAX_MORPHOLOGY_ITERATIONS
            ));
        }
        if self.dilate_iterations > 0 && self.erode_iterations > 0 {
            return invalid("dilate_iterations and erode_iterations are mutually exclusive".into());
        }
        if self.min_solid_pixels == 0 {
            return invalid("min_solid_pixels must be at least 1".into());
        }
        if self.min_contour_length < 3 {
            return invalid("min_contour_length must be at least 3".into());
        }
        if self.min_vertices < 3 {
            return invalid("min_vertices must be at least 3".into());
        }
        match self.simplify {
            SimplifyStrategy::Rdp { epsilon } if !(epsilon.is_finite() && epsilon >= 0.0) => {
                return invalid(format!(
                    "simplify epsilon must be finite and >= 0, got {epsilon}"
                ));
            }
            SimplifyStrategy::Resample { points } if points < self.min_vertices => {
                return invalid(format!(
                    "resample point count ({points}) must be >= min_vertices ({})",
                    self.min_vertices
                ));
            }
            _ => {}
        }
        if self.max_vertices < self.min_vertices {
            return invalid(format!(
                "max_vertices ({}) must be >= min_vertices ({})",
                self.max_vertices, self.min_vertices
            ));
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return invalid(format!("min_area must be finite and >= 0, got {}", self.min_area));
        }
        if !(self.fallback_size.is_finite() && self.fallback_size > 0.0) {
            return invalid(format!("fallback_size must be > 0, got {}", self.fallback_size));
        }
        if !(self.target_size.is_finite() && self.target_size > 0.0) {
            return invalid(format!("target_size must be > 0, got {}", self.target_size));
        }
        if !(self.hit_inset > 0.0 && self.hit_inset <= 1.0) {
            return invalid(format!("hit_inset must be in (0, 1], got {}", self.hit_inset));
        }
        Ok(())
    }

    /// Stable 64-bit fingerprint of every field.
    ///
    /// SipHash-1-3 with fixed keys over the JSON serialization, so the
    /// value is identical across runs and toolchain versions.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = SipHasher13::new();
        hasher.write(&bytes);
        hasher.finish()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: Self::DEFAULT_ALPHA_THRESHOLD,
            mask_channel: MaskChannel::default(),
            analysis_max: Self::DEFAULT_ANALYSIS_MAX,
            min_analysis_dim: Self::DEFAULT_MIN_ANALYSIS_DIM,
            max_upscale: Self::DEFAULT_MAX_UPSCALE,
            resample_filter: Self::DEFAULT_RESAMPLE_FILTER,
            dilate_iterations: 0,
            erode_iterations: 0,
            connectivity: Connectivity::default(),
            min_solid_pixels: Self::DEFAULT_MIN_SOLID_PIXELS,
            tracer: ContourTracerKind::default(),
            min_contour_length: Self::DEFAULT_MIN_CONTOUR_LENGTH,
            simplify: SimplifyStrategy::Rdp {
                epsilon: Self::DEFAULT_SIMPLIFY_EPSILON,
            },
            max_vertices: Self::DEFAULT_MAX_VERTICES,
            min_vertices: Self::DEFAULT_MIN_VERTICES,
            min_area: Self::DEFAULT_MIN_AREA,
            winding: Winding::default(),
            fallback_shape: FallbackShape::default(),
            fallback_size: Self::DEFAULT_FALLBACK_SIZE,
            target_size: Self::DEFAULT_TARGET_SIZE,
            hit_inset: Self::DEFAULT_HIT_INSET,
            collider: ColliderMode::default(),
        }
    }
}

/// Composite cache key: asset identities plus the config fingerprint.
///
/// Any change to a field that affects output changes the key, so stale
/// cached vertices are never reused after retuning.
#[must_use]
pub fn cache_key(texture: &str, mask: Option<&str>, config: &ExtractionConfig) -> String {
    format!(
        "{texture}|{}|{:016x}",
        mask.unwrap_or("-"),
        config.fingerprint()
    )
}
