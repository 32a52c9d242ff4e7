//! Body adapter: the seam to an external physics engine.
//!
//! [`plan_body`] turns a [`NormalizedShape`] into screen-sized collider
//! vertices plus the sprite placement that keeps the bitmap's alpha
//! centroid on the body's origin. [`spawn_body`] hands the plan to a
//! [`BodyFactory`] and degrades to a bounding rectangle when the engine
//! rejects the polygon.

use geo::{ConvexHull, Coord, Intersects, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::normalize::{NormalizedShape, bounds, signed_area};
use crate::types::Point;

/// How the collider polygon is handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColliderMode {
    /// The (possibly concave) polygon as extracted; the engine decomposes
    /// it if it needs to.
    #[default]
    Polygon,
    /// The polygon's convex hull.
    ConvexHull,
}

/// Everything a physics engine and a sprite renderer need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPlan {
    /// Collider vertices relative to the body origin, in screen units.
    pub vertices: Vec<Point>,
    /// Screen units per source pixel.
    pub sprite_scale: f64,
    /// Centroid position inside the sprite, as fractions of its size.
    pub anchor: Point,
    /// Displayed sprite size in screen units.
    pub sprite_size: Point,
    /// Top-left corner of the displayed sprite relative to the body
    /// origin.
    pub render_offset: Point,
    /// Collider mode the vertices were built for.
    pub mode: ColliderMode,
}

impl BodyPlan {
    /// Bounding rectangle of the collider as `(min, max)` corners.
    #[must_use]
    pub fn collider_bounds(&self) -> (Point, Point) {
        bounds(&self.vertices).unwrap_or((Point::ZERO, Point::ZERO))
    }
}

/// Scale `shape` to `target_size` and shrink the collider by `hit_inset`.
///
/// `sprite_scale = target_size / max(bounding_width, bounding_height)`;
/// collider vertices are scaled by `sprite_scale * hit_inset`. The sprite
/// itself is scaled by `sprite_scale` only, so the collider sits slightly
/// inside the visible silhouette.
#[must_use]
pub fn plan_body(
    shape: &NormalizedShape,
    target_size: f64,
    hit_inset: f64,
    mode: ColliderMode,
) -> BodyPlan {
    let extent = shape.bounding_max();
    let sprite_scale = if extent > 0.0 { target_size / extent } else { 1.0 };
    let collider_scale = sprite_scale * hit_inset;

    let outline = match mode {
        ColliderMode::Polygon => shape.vertices.clone(),
        ColliderMode::ConvexHull => convex_hull(&shape.vertices, signed_area(&shape.vertices)),
    };
    let vertices = outline.iter().map(|p| p.scale(collider_scale)).collect();

    let sprite_size = Point::new(
        f64::from(shape.source.width) * sprite_scale,
        f64::from(shape.source.height) * sprite_scale,
    );
    let anchor = Point::new(shape.x_offset, shape.y_offset);

    BodyPlan {
        vertices,
        sprite_scale,
        anchor,
        sprite_size,
        render_offset: Point::new(-anchor.x * sprite_size.x, -anchor.y * sprite_size.y),
        mode,
    }
}

/// [`plan_body`] with the target size, inset and mode from `config`.
#[must_use]
pub fn plan_body_with(shape: &NormalizedShape, config: &ExtractionConfig) -> BodyPlan {
    plan_body(shape, config.target_size, config.hit_inset, config.collider)
}

/// Convex hull with the same orientation sign as `area`.
fn convex_hull(vertices: &[Point], area: f64) -> Vec<Point> {
    let ring: Vec<Coord<f64>> = vertices.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let hull = Polygon::new(LineString::from(ring), vec![]).convex_hull();

    let mut out: Vec<Point> = hull.exterior().coords().map(|c| Point::new(c.x, c.y)).collect();
    // The exterior ring repeats its first coordinate.
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    if (signed_area(&out) >= 0.0) != (area >= 0.0) {
        out.reverse();
    }
    out
}

/// Whether the closed ring has no crossing edges.
///
/// Edges that share an endpoint in ring order are not compared. Rings
/// with fewer than 3 points are not simple.
#[must_use]
pub fn is_simple(vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let edge = |i: usize| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        Line::new(Coord { x: a.x, y: a.y }, Coord { x: b.x, y: b.y })
    };

    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edge(i).intersects(&edge(j)) {
                return false;
            }
        }
    }
    true
}

/// Constructor side of an external physics engine.
pub trait BodyFactory {
    /// The engine's body handle.
    type Body;
    /// Why the engine refused a polygon.
    type Error: std::fmt::Display;

    /// Build a body from collider vertices around the body origin.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when it rejects the vertex list (for
    /// example a self-intersecting ring).
    fn polygon(&mut self, vertices: &[Point]) -> Result<Self::Body, Self::Error>;

    /// Build an axis-aligned box body. Must not fail.
    fn rectangle(&mut self, width: f64, height: f64, center: Point) -> Self::Body;
}

/// A body handed back by [`spawn_body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnedBody<B> {
    /// The engine accepted the polygon.
    Polygon(B),
    /// The engine rejected the polygon; a bounding box was built instead.
    Degraded {
        /// The rectangle body.
        body: B,
        /// The engine's rejection message.
        error: String,
    },
}

impl<B> SpawnedBody<B> {
    /// The body handle, whichever way it was built.
    pub fn into_body(self) -> B {
        match self {
            Self::Polygon(body) | Self::Degraded { body, .. } => body,
        }
    }

    /// Whether the rectangle fallback was used.
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Build the body for `plan`, degrading to its bounding rectangle when
/// the factory rejects the polygon. Never fails.
pub fn spawn_body<F: BodyFactory>(factory: &mut F, plan: &BodyPlan) -> SpawnedBody<F::Body> {
    match factory.polygon(&plan.vertices) {
        Ok(body) => SpawnedBody::Polygon(body),
        Err(err) => {
            let (lo, hi) = plan.collider_bounds();
            let error = err.to_string();
            tracing::warn!(
                %error,
                vertices = plan.vertices.len(),
                "polygon body rejected, using bounding box"
            );
            let center = Point::new(f64::midpoint(lo.x, hi.x), f64::midpoint(lo.y, hi.y));
            SpawnedBody::Degraded {
                body: factory.rectangle(hi.x - lo.x, hi.y - lo.y, center),
                error,
            }
        }
    }
}
