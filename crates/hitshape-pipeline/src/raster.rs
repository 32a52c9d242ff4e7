//! Image decoding and rasterization to the analysis grid.
//!
//! The source is cropped to the bounding box of its solid pixels and
//! resampled so the crop's longer side lands on the analysis budget.
//! Small sprites are up-sampled (clamped by `max_upscale`) so the tracer
//! has enough pixels to work with; large ones are down-sampled for speed.
//!
//! [`AnalysisFrame`] remembers the crop and the per-axis scale factors
//! so that traced points can be mapped back to source-image pixels.

use image::{Pixel, RgbaImage, imageops};

use crate::config::{ExtractionConfig, MaskChannel, ResampleFilter};
use crate::types::{BoundingBox, Dimensions, PipelineError, Point};

/// Decode raw image bytes (PNG, JPEG, BMP, WebP) into RGBA.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Combine the texture with an optional silhouette mask.
///
/// Without a mask the texture is returned as-is and its own alpha is the
/// coverage. With a mask, the texture's alpha is replaced by the mask's
/// coverage (alpha, or luminance weighted by alpha). A mask whose size
/// differs from the texture is resampled to the texture's size first.
#[must_use]
pub fn coverage(texture: &RgbaImage, mask: Option<&RgbaImage>, channel: MaskChannel) -> RgbaImage {
    let Some(mask) = mask else {
        return texture.clone();
    };

    let resized;
    let mask = if mask.dimensions() == texture.dimensions() {
        mask
    } else {
        resized = imageops::resize(
            mask,
            texture.width(),
            texture.height(),
            imageops::FilterType::Triangle,
        );
        &resized
    };

    let mut out = texture.clone();
    for (dst, src) in out.pixels_mut().zip(mask.pixels()) {
        dst[3] = match channel {
            MaskChannel::Alpha => src[3],
            MaskChannel::Luma => {
                let luma = u16::from(src.to_luma()[0]);
                let weighted = luma * u16::from(src[3]) / 255;
                u8::try_from(weighted).unwrap_or(u8::MAX)
            }
        };
    }
    out
}

/// Bounding box of all pixels whose alpha is strictly above `threshold`.
///
/// Returns `None` when no pixel qualifies.
#[must_use]
pub fn solid_bounds(image: &RgbaImage, threshold: u8) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > threshold {
            match bounds.as_mut() {
                Some(bb) => bb.include(x, y),
                None => bounds = Some(BoundingBox::at(x, y)),
            }
        }
    }
    bounds
}

/// Scale factor from the cropped source region to the analysis grid.
///
/// The longer side targets `analysis_max` and the shorter side is raised
/// to at least `min_analysis_dim`. The short-side floor wins, so a thin
/// crop can overshoot `analysis_max` on its longer side: at most by
/// `max_upscale`, and never past [`ExtractionConfig::MAX_ANALYSIS_MAX`].
#[must_use]
pub fn analysis_scale(crop: Dimensions, config: &ExtractionConfig) -> f64 {
    let longer = f64::from(crop.longer().max(1));
    let shorter = f64::from(crop.width.min(crop.height).max(1));
    let budget = f64::from(config.analysis_max) / longer;
    let floor = f64::from(config.min_analysis_dim) / shorter;
    let ceiling = f64::from(ExtractionConfig::MAX_ANALYSIS_MAX) / longer;
    budget.max(floor).min(config.max_upscale).min(ceiling)
}

/// Analysis grid size for a crop at the given scale (each axis ≥ 1).
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "scaled crop sides are small positive values"
)]
pub fn analysis_dimensions(crop: Dimensions, scale: f64) -> Dimensions {
    let side = |n: u32| ((f64::from(n) * scale).round() as u32).max(1);
    Dimensions {
        width: side(crop.width),
        height: side(crop.height),
    }
}

/// Resample `image` into a `width`×`height` RGBA buffer.
///
/// Returns a copy when the size already matches.
#[must_use]
pub fn rasterize(image: &RgbaImage, width: u32, height: u32, filter: ResampleFilter) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, filter.to_image_filter())
}

/// Crop `image` to `crop` and rasterize the crop to `grid`.
#[must_use]
pub fn rasterize_crop(
    image: &RgbaImage,
    crop: BoundingBox,
    grid: Dimensions,
    filter: ResampleFilter,
) -> RgbaImage {
    let view = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
    rasterize(&view, grid.width, grid.height, filter)
}

/// Mapping between analysis-grid coordinates and source-image pixels.
///
/// Grid coordinates are measured in analysis pixels from the current
/// grid's top-left corner. Padding and component cropping shift that
/// corner; [`offset`](Self::offset) records the shift so
/// [`to_source`](Self::to_source) stays exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisFrame {
    /// Source image size.
    pub source: Dimensions,
    /// Region of the source that was rasterized.
    pub crop: BoundingBox,
    /// Size of the rasterized grid (before padding).
    pub grid: Dimensions,
    /// Analysis pixels per source pixel, horizontally.
    pub scale_x: f64,
    /// Analysis pixels per source pixel, vertically.
    pub scale_y: f64,
    /// Position of the current grid's origin in rasterized-grid pixels.
    pub origin: Point,
}

impl AnalysisFrame {
    /// Build the frame for a crop rasterized to `grid`.
    #[must_use]
    pub fn new(source: Dimensions, crop: BoundingBox, grid: Dimensions) -> Self {
        Self {
            source,
            crop,
            grid,
            scale_x: f64::from(grid.width) / f64::from(crop.width),
            scale_y: f64::from(grid.height) / f64::from(crop.height),
            origin: Point::ZERO,
        }
    }

    /// Shift the grid origin by `(dx, dy)` analysis pixels.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            origin: self.origin + Point::new(dx, dy),
            ..self
        }
    }

    /// Map a point in current grid coordinates to source-image pixels.
    #[must_use]
    pub fn to_source(&self, p: Point) -> Point {
        Point::new(
            f64::from(self.crop.x) + (p.x + self.origin.x) / self.scale_x,
            f64::from(self.crop.y) + (p.y + self.origin.y) / self.scale_y,
        )
    }

    /// Mean of the two axis scale factors.
    #[must_use]
    pub fn mean_scale(&self) -> f64 {
        f64::midpoint(self.scale_x, self.scale_y)
    }
}
