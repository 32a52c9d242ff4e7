//! Failure reasons, fallback polygons and the extraction outcome.
//!
//! Every non-exceptional failure (empty mask, tiny silhouette, degenerate
//! geometry, an asset that will not load) ends here: the caller gets a
//! small fixed polygon with the same structure as a real extraction, and
//! a reason it can log.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::normalize::{NormalizedShape, signed_area};
use crate::types::{BoundingBox, Dimensions, Point};

/// Why an extraction did not produce a traced polygon.
///
/// Serializes as its display string, e.g. `"contour too short"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum FailureReason {
    /// The coverage channel has no pixel above the threshold.
    #[error("mask has no solid pixels")]
    #[serde(rename = "mask has no solid pixels")]
    NoSolidPixels,
    /// The largest component is below `min_solid_pixels`.
    #[error("too few solid pixels")]
    #[serde(rename = "too few solid pixels")]
    TooFewSolidPixels,
    /// The tracer found no boundary to follow.
    #[error("no boundary pixel found")]
    #[serde(rename = "no boundary pixel found")]
    NoBoundaryPixel,
    /// The traced contour is shorter than `min_contour_length`.
    #[error("contour too short")]
    #[serde(rename = "contour too short")]
    ContourTooShort,
    /// Simplification left fewer than `min_vertices` points.
    #[error("resample/simplify produced too few vertices")]
    #[serde(rename = "resample/simplify produced too few vertices")]
    TooFewVertices,
    /// The polygon's area is below `min_area`.
    #[error("area too small")]
    #[serde(rename = "area too small")]
    AreaTooSmall,
    /// The image could not be loaded, decoded, or loaded in time.
    #[error("image load failed")]
    #[serde(rename = "image load failed")]
    ImageLoadFailed,
    /// Reading the image's pixels was not permitted.
    #[error("pixel read denied")]
    #[serde(rename = "pixel read denied")]
    PixelReadDenied,
}

impl FailureReason {
    /// Every reason, in pipeline order.
    pub const ALL: [Self; 8] = [
        Self::ImageLoadFailed,
        Self::PixelReadDenied,
        Self::NoSolidPixels,
        Self::TooFewSolidPixels,
        Self::NoBoundaryPixel,
        Self::ContourTooShort,
        Self::TooFewVertices,
        Self::AreaTooSmall,
    ];
}

/// Shape handed out when extraction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackShape {
    /// Six vertices approximating a rounded rectangle.
    #[default]
    Hexagon,
    /// Axis-aligned square.
    Rectangle,
}

impl FallbackShape {
    /// Vertices of the shape with bounding size `size`, centred on the
    /// origin, in screen order (positive signed area).
    #[must_use]
    pub fn vertices(self, size: f64) -> Vec<Point> {
        let h = size / 2.0;
        let q = size / 4.0;
        match self {
            Self::Hexagon => vec![
                Point::new(-q, -h),
                Point::new(q, -h),
                Point::new(h, 0.0),
                Point::new(q, h),
                Point::new(-q, h),
                Point::new(-h, 0.0),
            ],
            Self::Rectangle => vec![
                Point::new(-h, -h),
                Point::new(h, -h),
                Point::new(h, h),
                Point::new(-h, h),
            ],
        }
    }
}

/// Build the fallback shape for `reason`.
///
/// The polygon is `config.fallback_shape` at `config.fallback_size`,
/// wound per `config.winding`, anchored at the middle of a square source
/// of the same size.
#[must_use]
pub fn fallback(reason: FailureReason, config: &ExtractionConfig) -> NormalizedShape {
    fallback_for(reason, None, config)
}

/// [`fallback`] anchored in a known source image.
///
/// The polygon keeps the configured size; `source` only replaces the
/// square placeholder so sprite placement keeps the image's aspect ratio.
#[must_use]
pub fn fallback_for(
    reason: FailureReason,
    source: Option<Dimensions>,
    config: &ExtractionConfig,
) -> NormalizedShape {
    let size = config.fallback_size;
    let mut vertices = config.fallback_shape.vertices(size);
    let area = signed_area(&vertices);
    if !config.winding.matches(area) {
        vertices.reverse();
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "fallback_size is validated positive and small"
    )]
    let side = (size.round() as u32).max(1);

    NormalizedShape {
        vertices,
        winding: config.winding,
        x_offset: 0.5,
        y_offset: 0.5,
        bounding_width: size,
        bounding_height: size,
        source: source.unwrap_or(Dimensions {
            width: side,
            height: side,
        }),
        solidity: area.abs() / (size * size),
        reason: Some(reason),
    }
}

/// What the pipeline learned before it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMeta {
    /// Source image size, once decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Dimensions>,
    /// Solid-pixel crop in source pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<BoundingBox>,
    /// Analysis grid size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Dimensions>,
    /// Connected components found.
    pub component_count: usize,
    /// Pixels in the largest component.
    pub selected_pixel_count: u64,
    /// Points in the traced contour.
    pub contour_length: usize,
    /// Vertices after simplification.
    pub vertex_count: usize,
}

/// Outcome of one extraction.
///
/// Serializes as `{"ok": true, "shape": …}` or
/// `{"ok": false, "reason": …, "shape": <fallback>, "partial": …}` so a
/// consumer can always read `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResultRepr", try_from = "ResultRepr")]
pub enum ExtractionResult {
    /// A traced and normalized polygon.
    Extracted(NormalizedShape),
    /// Extraction failed; `fallback` stands in for the shape.
    Failed {
        /// Why extraction failed.
        reason: FailureReason,
        /// Fallback polygon carrying the same reason.
        fallback: NormalizedShape,
        /// Metadata gathered before the failure.
        partial: PartialMeta,
    },
}

impl ExtractionResult {
    /// Build a failed result with the configured fallback shape.
    #[must_use]
    pub fn failed(reason: FailureReason, partial: PartialMeta, config: &ExtractionConfig) -> Self {
        tracing::warn!(%reason, "collider extraction fell back");
        Self::Failed {
            reason,
            fallback: fallback_for(reason, partial.source, config),
            partial,
        }
    }

    /// Whether a polygon was extracted.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }

    /// The extracted shape, or the fallback.
    #[must_use]
    pub const fn shape(&self) -> &NormalizedShape {
        match self {
            Self::Extracted(shape) | Self::Failed { fallback: shape, .. } => shape,
        }
    }

    /// Consume the result, returning the extracted shape or the fallback.
    #[must_use]
    pub fn into_shape(self) -> NormalizedShape {
        match self {
            Self::Extracted(shape) | Self::Failed { fallback: shape, .. } => shape,
        }
    }

    /// The failure reason, if extraction failed.
    #[must_use]
    pub const fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Extracted(_) => None,
            Self::Failed { reason, .. } => Some(*reason),
        }
    }

    /// Partial metadata, if extraction failed.
    #[must_use]
    pub const fn partial(&self) -> Option<&PartialMeta> {
        match self {
            Self::Extracted(_) => None,
            Self::Failed { partial, .. } => Some(partial),
        }
    }
}

/// Flat wire form of [`ExtractionResult`].
#[derive(Serialize, Deserialize)]
struct ResultRepr {
    ok: bool,
    shape: NormalizedShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partial: Option<PartialMeta>,
}

impl From<ExtractionResult> for ResultRepr {
    fn from(result: ExtractionResult) -> Self {
        match result {
            ExtractionResult::Extracted(shape) => Self {
                ok: true,
                shape,
                reason: None,
                partial: None,
            },
            ExtractionResult::Failed {
                reason,
                fallback,
                partial,
            } => Self {
                ok: false,
                shape: fallback,
                reason: Some(reason),
                partial: Some(partial),
            },
        }
    }
}

impl TryFrom<ResultRepr> for ExtractionResult {
    type Error = String;

    fn try_from(repr: ResultRepr) -> Result<Self, Self::Error> {
        match (repr.ok, repr.reason) {
            (true, None) => Ok(Self::Extracted(repr.shape)),
            (false, Some(reason)) => Ok(Self::Failed {
                reason,
                fallback: repr.shape,
                partial: repr.partial.unwrap_or_default(),
            }),
            (true, Some(_)) => Err("ok result must not carry a reason".into()),
            (false, None) => Err("failed result must carry a reason".into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::centroid;
    use crate::types::Winding;

    #[test]
    fn reason_strings_are_exact() {
        let strings: Vec<String> = FailureReason::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            strings,
            [
                "image load failed",
                "pixel read denied",
                "mask has no solid pixels",
                "too few solid pixels",
                "no boundary pixel found",
                "contour too short",
                "resample/simplify produced too few vertices",
                "area too small",
            ]
        );
    }

    #[test]
    fn every_fallback_is_a_valid_shape() {
        for shape in [FallbackShape::Hexagon, FallbackShape::Rectangle] {
            for winding in [Winding::Clockwise, Winding::CounterClockwise] {
                let config = ExtractionConfig {
                    fallback_shape: shape,
                    winding,
                    ..ExtractionConfig::default()
                };
                for reason in FailureReason::ALL {
                    let fb = fallback(reason, &config);
                    assert_eq!(fb.reason, Some(reason));
                    assert!(fb.vertices.len() >= config.min_vertices);
                    assert!(winding.matches(signed_area(&fb.vertices)));
                    assert!(signed_area(&fb.vertices).abs() > 0.0);
                    assert!(centroid(&fb.vertices).distance(Point::ZERO) < 1e-9);
                    assert_eq!(fb.bounding_max(), config.fallback_size);
                    assert_eq!((fb.x_offset, fb.y_offset), (0.5, 0.5));
                }
            }
        }
    }

    #[test]
    fn hexagon_solidity() {
        let fb = fallback(FailureReason::AreaTooSmall, &ExtractionConfig::default());
        assert!((fb.solidity - 0.75).abs() < 1e-12);
    }

    #[test]
    fn failed_result_exposes_fallback_shape() {
        let config = ExtractionConfig::default();
        let result =
            ExtractionResult::failed(FailureReason::NoSolidPixels, PartialMeta::default(), &config);
        assert!(!result.is_ok());
        assert_eq!(result.reason(), Some(FailureReason::NoSolidPixels));
        assert_eq!(result.shape().reason, Some(FailureReason::NoSolidPixels));
        assert!(result.partial().is_some());
    }

    #[test]
    fn json_carries_ok_flag() {
        let config = ExtractionConfig::default();
        let failed = ExtractionResult::failed(
            FailureReason::ContourTooShort,
            PartialMeta::default(),
            &config,
        );
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["reason"], "contour too short");
        assert!(value["shape"]["vertices"].is_array());

        let back: ExtractionResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, failed);

        let ok = ExtractionResult::Extracted(fallback(FailureReason::AreaTooSmall, &config));
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["ok"], true);
        assert!(value.get("reason").is_none());
    }

    #[test]
    fn every_reason_serializes_as_its_display_string() {
        for reason in FailureReason::ALL {
            let value = serde_json::to_value(reason).unwrap();
            assert_eq!(value, reason.to_string());
            assert_eq!(serde_json::from_value::<FailureReason>(value).unwrap(), reason);
        }
    }

    #[test]
    fn failed_result_keeps_known_source_size() {
        let config = ExtractionConfig::default();
        let partial = PartialMeta {
            source: Some(Dimensions {
                width: 200,
                height: 100,
            }),
            ..PartialMeta::default()
        };
        let result = ExtractionResult::failed(FailureReason::AreaTooSmall, partial, &config);
        let shape = result.shape();
        assert_eq!(
            shape.source,
            Dimensions {
                width: 200,
                height: 100
            }
        );
        assert_eq!(shape.bounding_max(), config.fallback_size);

        let unknown = ExtractionResult::failed(
            FailureReason::ImageLoadFailed,
            PartialMeta::default(),
            &config,
        );
        assert_eq!(unknown.shape().source.width, unknown.shape().source.height);
    }

    #[test]
    fn inconsistent_json_is_rejected() {
        let config = ExtractionConfig::default();
        let mut value = serde_json::to_value(ExtractionResult::failed(
            FailureReason::AreaTooSmall,
            PartialMeta::default(),
            &config,
        ))
        .unwrap();
        value["ok"] = serde_json::Value::Bool(true);
        assert!(serde_json::from_value::<ExtractionResult>(value).is_err());
    }
}
