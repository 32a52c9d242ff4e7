//! Contour simplification.
//!
//! Two strategies reduce a traced contour to a collider-sized polygon:
//!
//! - Ramer-Douglas-Peucker over the closed ring, run with an explicit
//!   work stack so that long, nearly-straight contours cannot exhaust the
//!   call stack.
//! - Arc-length resampling to a fixed point count, for callers that
//!   value a predictable vertex count over fidelity.
//!
//! Both are followed by near-duplicate removal and a stride-based vertex
//! cap, which never simplifies geometrically and so gives a
//! deterministic worst-case output size.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::types::{Contour, Point};

/// Consecutive points closer than this (analysis pixels) are merged.
pub const DEDUPE_DISTANCE: f64 = 0.25;

/// Selects how a traced contour is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimplifyStrategy {
    /// Ramer-Douglas-Peucker with tolerance `epsilon` in analysis pixels.
    Rdp {
        /// Maximum distance of a dropped point from the kept chord.
        epsilon: f64,
    },
    /// Uniform arc-length resampling to exactly `points` points.
    Resample {
        /// Output point count before the vertex cap.
        points: usize,
    },
}

impl Default for SimplifyStrategy {
    fn default() -> Self {
        Self::Rdp {
            epsilon: ExtractionConfig::DEFAULT_SIMPLIFY_EPSILON,
        }
    }
}

/// Distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond
/// either end measure to that endpoint. Coincident endpoints degrade to
/// point-to-point distance.
#[must_use]
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let t = (dx.mul_add(p.x - a.x, dy * (p.y - a.y)) / length_sq).clamp(0.0, 1.0);
    let projection = Point::new(dx.mul_add(t, a.x), dy.mul_add(t, a.y));
    p.distance(projection)
}

/// Simplify an open polyline; both endpoints are always kept.
///
/// Points within `epsilon` of the chord between their kept neighbors are
/// removed. Polylines with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified points"]
pub fn rdp(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; n];
    kept[0] = true;
    kept[n - 1] = true;

    let mut stack = vec![(0, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;
        for (i, &p) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = perpendicular_distance(p, points[start], points[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist > epsilon {
            kept[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Simplify a closed ring.
///
/// The ring is opened at its first point, closed again by repeating that
/// point at the end, simplified with [`rdp`], and the repeat is dropped.
#[must_use = "returns the simplified points"]
pub fn simplify_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut ring = Vec::with_capacity(points.len() + 1);
    ring.extend_from_slice(points);
    ring.push(first);

    let mut simplified = rdp(&ring, epsilon);
    simplified.pop();
    simplified
}

/// Drop consecutive points closer than `min_distance`, treating the
/// input as a closed ring (the last point is also compared to the first).
#[must_use = "returns the deduplicated points"]
pub fn dedupe(points: &[Point], min_distance: f64) -> Vec<Point> {
    let min_sq = min_distance * min_distance;
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_none_or(|&last| last.distance_squared(p) >= min_sq) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[out.len() - 1].distance_squared(out[0]) < min_sq {
        out.pop();
    }
    out
}

/// Subsample by fixed stride down to at most `max` points.
///
/// Keeps indices `floor(i * len / max)` for `i` in `0..max`.
#[must_use = "returns the capped points"]
pub fn cap_vertices(points: &[Point], max: usize) -> Vec<Point> {
    let len = points.len();
    if len <= max {
        return points.to_vec();
    }
    (0..max).map(|i| points[i * len / max]).collect()
}

/// Resample a closed ring to `count` points evenly spaced by arc length.
///
/// The first output point is the first input point. Rings with fewer
/// than two points or zero perimeter are returned unchanged.
#[must_use = "returns the resampled points"]
#[allow(clippy::cast_precision_loss, reason = "point counts are small")]
pub fn resample(points: &[Point], count: usize) -> Vec<Point> {
    let n = points.len();
    if n < 2 || count == 0 {
        return points.to_vec();
    }

    let edge = |i: usize| (points[i], points[(i + 1) % n]);
    let perimeter: f64 = (0..n).map(|i| edge(i).0.distance(edge(i).1)).sum();
    if perimeter <= 0.0 {
        return points.to_vec();
    }

    let step = perimeter / count as f64;
    let mut out = Vec::with_capacity(count);
    let mut seg = 0;
    let mut seg_start = 0.0;

    for k in 0..count {
        let target = k as f64 * step;
        loop {
            let (a, b) = edge(seg);
            let len = a.distance(b);
            if target <= seg_start + len || seg == n - 1 {
                let t = if len > 0.0 {
                    ((target - seg_start) / len).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                out.push(a + (b - a).scale(t));
                break;
            }
            seg_start += len;
            seg += 1;
        }
    }
    out
}

/// Reduce a traced contour with `strategy`, then dedupe and cap it at
/// `max_vertices`.
///
/// The vertex floor is checked by the caller.
#[must_use = "returns the simplified contour"]
pub fn simplify(contour: &Contour, strategy: SimplifyStrategy, max_vertices: usize) -> Contour {
    let reduced = match strategy {
        SimplifyStrategy::Rdp { epsilon } => simplify_closed(contour.points(), epsilon),
        SimplifyStrategy::Resample { points } => resample(contour.points(), points),
    };
    let deduped = dedupe(&reduced, DEDUPE_DISTANCE);
    let capped = cap_vertices(&deduped, max_vertices);

    tracing::debug!(
        traced = contour.len(),
        reduced = reduced.len(),
        output = capped.len(),
        ?strategy,
        "simplified contour"
    );
    Contour::new(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    /// Closed ring around an axis-aligned rectangle with a point every
    /// half unit, like a marching-squares trace.
    fn dense_rectangle(w: u32, h: u32) -> Vec<Point> {
        let (w, h) = (f64::from(w), f64::from(h));
        let mut out = Vec::new();
        let mut push_edge = |from: Point, to: Point| {
            let steps = (from.distance(to) * 2.0).round() as u32;
            for i in 0..steps {
                out.push(from + (to - from).scale(f64::from(i) / f64::from(steps)));
            }
        };
        push_edge(Point::new(0.0, 0.0), Point::new(w, 0.0));
        push_edge(Point::new(w, 0.0), Point::new(w, h));
        push_edge(Point::new(w, h), Point::new(0.0, h));
        push_edge(Point::new(0.0, h), Point::new(0.0, 0.0));
        out
    }

    #[test]
    fn default_strategy_is_rdp() {
        assert_eq!(
            SimplifyStrategy::default(),
            SimplifyStrategy::Rdp {
                epsilon: ExtractionConfig::DEFAULT_SIMPLIFY_EPSILON
            }
        );
    }

    #[test]
    fn strategy_json_is_tagged() {
        let json = serde_json::to_string(&SimplifyStrategy::Resample { points: 32 })
            .unwrap_or_default();
        assert_eq!(json, r#"{"kind":"resample","points":32}"#);
    }

    #[test]
    fn distance_to_segment_interior() {
        let d = perpendicular_distance(
            Point::new(1.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn distance_beyond_segment_end_is_clamped() {
        // The infinite line would give 0; the segment ends at (2, 0).
        let d = perpendicular_distance(
            Point::new(5.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }

    #[test]
    fn rdp_short_inputs_unchanged() {
        assert!(rdp(&[], 1.0).is_empty());
        assert_eq!(rdp(&pts(&[(0.0, 0.0), (1.0, 1.0)]), 1.0).len(), 2);
    }

    #[test]
    fn rdp_collinear_collapses_to_endpoints() {
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        assert_eq!(rdp(&line, 0.1), pts(&[(0.0, 0.0), (4.0, 4.0)]));
    }

    #[test]
    fn rdp_keeps_peaks_above_tolerance() {
        let zigzag = pts(&[(0.0, 0.0), (2.0, 5.0), (4.0, 0.0), (6.0, 5.0), (8.0, 0.0)]);
        assert_eq!(rdp(&zigzag, 1.0).len(), 5);
        assert_eq!(rdp(&zigzag, 10.0).len(), 2);
    }

    #[test]
    fn rdp_handles_very_long_nearly_straight_input() {
        let line: Vec<Point> = (0..200_000)
            .map(|i| Point::new(f64::from(i), if i % 2 == 0 { 0.0 } else { 0.01 }))
            .collect();
        assert_eq!(rdp(&line, 0.5).len(), 2);
    }

    #[test]
    fn closed_rectangle_reduces_to_corners() {
        let ring = dense_rectangle(40, 20);
        let simplified = simplify_closed(&ring, 0.5);
        assert_eq!(
            simplified,
            pts(&[(0.0, 0.0), (40.0, 0.0), (40.0, 20.0), (0.0, 20.0)])
        );
    }

    #[test]
    fn closed_short_rings_unchanged() {
        assert!(simplify_closed(&[], 1.0).is_empty());
        let two = pts(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(simplify_closed(&two, 1.0), two);
    }

    #[test]
    fn dedupe_drops_consecutive_and_wrap_duplicates() {
        let ring = pts(&[(0.0, 0.0), (0.1, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 0.1)]);
        assert_eq!(
            dedupe(&ring, DEDUPE_DISTANCE),
            pts(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])
        );
    }

    #[test]
    fn cap_uses_fixed_stride() {
        let ring: Vec<Point> = (0..10).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let capped = cap_vertices(&ring, 4);
        // floor(i * 10 / 4) = 0, 2, 5, 7
        assert_eq!(capped, pts(&[(0.0, 0.0), (2.0, 0.0), (5.0, 0.0), (7.0, 0.0)]));
        assert_eq!(cap_vertices(&ring, 20).len(), 10);
    }

    #[test]
    fn resample_spaces_points_evenly() {
        let square = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let out = resample(&square, 8);
        assert_eq!(out.len(), 8);
        assert_eq!(out[0], Point::new(0.0, 0.0));
        assert_eq!(out[1], Point::new(2.0, 0.0));
        assert_eq!(out[2], Point::new(4.0, 0.0));
        assert_eq!(out[3], Point::new(4.0, 2.0));
        for i in 0..8 {
            let d = out[i].distance(out[(i + 1) % 8]);
            assert!((d - 2.0).abs() < 1e-9, "gap {i} is {d}");
        }
    }

    #[test]
    fn resample_degenerate_ring_unchanged() {
        let dot = pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(resample(&dot, 5), dot);
    }

    #[test]
    fn simplify_applies_cap_after_strategy() {
        let contour = Contour::new(dense_rectangle(30, 30));
        let out = simplify(&contour, SimplifyStrategy::Resample { points: 50 }, 12);
        assert_eq!(out.len(), 12);

        let out = simplify(&contour, SimplifyStrategy::default(), 96);
        assert_eq!(out.len(), 4);
    }
}
