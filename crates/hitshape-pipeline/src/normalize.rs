//! Centroid normalization.
//!
//! Maps a simplified polygon from analysis-grid coordinates back to
//! source-image pixels and re-centres it on its own area-weighted
//! centroid. The bounding-box centre is never used: for any asymmetric
//! silhouette it differs from the centroid, and a body built around it
//! visibly floats away from its sprite.
//!
//! The sprite offset records where that centroid falls inside the source
//! image, as a fraction of each axis, so the renderer can anchor the
//! bitmap on the body's origin.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::fallback::FailureReason;
use crate::raster::AnalysisFrame;
use crate::types::{Contour, Dimensions, Point, Winding};

/// Below this area magnitude the centroid falls back to the vertex mean.
pub const DEGENERATE_AREA: f64 = 1e-6;

/// The final collider polygon and its alignment metadata.
///
/// Failed extractions produce a value of the same shape (see
/// [`fallback`](crate::fallback::fallback)) with `reason` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedShape {
    /// Vertices in source pixels, relative to the area centroid.
    pub vertices: Vec<Point>,
    /// Winding of `vertices`.
    pub winding: Winding,
    /// Centroid position as a fraction of the source width, in `[0, 1]`.
    pub x_offset: f64,
    /// Centroid position as a fraction of the source height, in `[0, 1]`.
    pub y_offset: f64,
    /// Width of the polygon's bounding box, in source pixels.
    pub bounding_width: f64,
    /// Height of the polygon's bounding box, in source pixels.
    pub bounding_height: f64,
    /// Source image size.
    pub source: Dimensions,
    /// Selected pixels over the selected component's bounding-box area.
    pub solidity: f64,
    /// Why extraction fell back, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl NormalizedShape {
    /// Longer side of the bounding box.
    #[must_use]
    pub fn bounding_max(&self) -> f64 {
        self.bounding_width.max(self.bounding_height)
    }

    /// Centroid in absolute source-image pixels.
    #[must_use]
    pub fn centroid_in_source(&self) -> Point {
        Point::new(
            self.x_offset * f64::from(self.source.width),
            self.y_offset * f64::from(self.source.height),
        )
    }
}

/// Shoelace signed area `Σ(xᵢyᵢ₊₁ − xᵢ₊₁yᵢ) / 2` of a closed ring.
#[must_use]
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    twice / 2.0
}

/// Arithmetic mean of the points, or the origin for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "vertex counts are small")]
pub fn mean(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let sum = points.iter().fold(Point::ZERO, |acc, &p| acc + p);
    sum.scale(1.0 / points.len() as f64)
}

/// Area-weighted centroid of a closed ring.
///
/// Falls back to [`mean`] when `|area| <` [`DEGENERATE_AREA`].
#[must_use]
pub fn centroid(points: &[Point]) -> Point {
    let area = signed_area(points);
    if area.abs() < DEGENERATE_AREA {
        return mean(points);
    }

    let n = points.len();
    let (cx, cy) = (0..n).fold((0.0, 0.0), |(cx, cy), i| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let cross = a.x.mul_add(b.y, -(b.x * a.y));
        ((a.x + b.x).mul_add(cross, cx), (a.y + b.y).mul_add(cross, cy))
    });
    let factor = 1.0 / (6.0 * area);
    Point::new(cx * factor, cy * factor)
}

/// Axis-aligned bounds as `(min, max)` corners, or `None` if empty.
#[must_use]
pub fn bounds(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}

/// Normalize a simplified polygon in grid coordinates.
///
/// # Errors
///
/// - [`FailureReason::TooFewVertices`] when the polygon has fewer than
///   `config.min_vertices` points.
/// - [`FailureReason::AreaTooSmall`] when its area in source pixels is
///   below `config.min_area`.
pub fn normalize(
    polygon: &Contour,
    frame: &AnalysisFrame,
    solidity: f64,
    config: &ExtractionConfig,
) -> Result<NormalizedShape, FailureReason> {
    if polygon.len() < config.min_vertices {
        return Err(FailureReason::TooFewVertices);
    }

    let source_points: Vec<Point> = polygon.points().iter().map(|&p| frame.to_source(p)).collect();
    let area = signed_area(&source_points);
    if area.abs() < config.min_area {
        tracing::debug!(area, min_area = config.min_area, "polygon area below floor");
        return Err(FailureReason::AreaTooSmall);
    }

    let center = centroid(&source_points);
    let mut vertices: Vec<Point> = source_points.iter().map(|&p| p - center).collect();
    if !config.winding.matches(area) {
        vertices.reverse();
    }

    let (lo, hi) = bounds(&vertices).ok_or(FailureReason::TooFewVertices)?;
    let source = frame.source;

    Ok(NormalizedShape {
        vertices,
        winding: config.winding,
        x_offset: (center.x / f64::from(source.width)).clamp(0.0, 1.0),
        y_offset: (center.y / f64::from(source.height)).clamp(0.0, 1.0),
        bounding_width: hi.x - lo.x,
        bounding_height: hi.y - lo.y,
        source,
        solidity,
        reason: None,
    })
}
