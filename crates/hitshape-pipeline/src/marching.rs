//! Marching squares boundary extraction.
//!
//! Samples sit at pixel centers and the grid is surrounded by an implicit
//! one-pixel empty border, so every region yields closed loops. Each 2×2
//! cell is classified by a 4-bit code (TL=8, TR=4, BR=2, BL=1) and emits
//! up to two segments between edge midpoints. Segments are oriented with
//! the solid side on the right (screen coordinates, +Y down), which makes
//! every endpoint the start of exactly one segment: chaining is a plain
//! lookup.
//!
//! Endpoints are kept in doubled integer coordinates while chaining so
//! that keys match exactly; they lie on pixel edges once halved.

use std::collections::HashMap;

use crate::binarize::PixelGrid;
use crate::config::Connectivity;
use crate::types::{Contour, Point};

/// Cell edge midpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

use Edge::{Bottom, Left, Right, Top};

type Key = (i64, i64);
type Segment = (Key, Key);

/// Oriented segments for each non-saddle case code.
const CASES: [&[(Edge, Edge)]; 16] = [
    &[],
    &[(Left, Bottom)],
    &[(Bottom, Right)],
    &[(Left, Right)],
    &[(Right, Top)],
    &[], // saddle, see `saddle_segments`
    &[(Bottom, Top)],
    &[(Left, Top)],
    &[(Top, Left)],
    &[(Top, Bottom)],
    &[], // saddle, see `saddle_segments`
    &[(Top, Right)],
    &[(Right, Left)],
    &[(Right, Bottom)],
    &[(Bottom, Left)],
    &[],
];

/// Segments for the two ambiguous cases.
///
/// The cell center is sampled under the selector's connectivity: with
/// 8-connectivity the diagonal corners belong to one region and the
/// center is solid; with 4-connectivity they are separate and the center
/// is empty.
const fn saddle_segments(code: u8, center_solid: bool) -> &'static [(Edge, Edge)] {
    match (code, center_solid) {
        // TR + BL
        (5, false) => &[(Left, Bottom), (Right, Top)],
        (5, true) => &[(Left, Top), (Right, Bottom)],
        // TL + BR
        (10, false) => &[(Top, Left), (Bottom, Right)],
        (10, true) => &[(Top, Right), (Bottom, Left)],
        _ => &[],
    }
}

/// Doubled coordinates of an edge midpoint of cell `(cx, cy)`.
///
/// Cell `(cx, cy)` spans samples `cx..=cx+1` by `cy..=cy+1` of the
/// padded grid, i.e. pixel centers `cx-0.5..=cx+0.5`.
const fn midpoint(cx: i64, cy: i64, edge: Edge) -> Key {
    match edge {
        Top => (2 * cx, 2 * cy - 1),
        Bottom => (2 * cx, 2 * cy + 1),
        Left => (2 * cx - 1, 2 * cy),
        Right => (2 * cx + 1, 2 * cy),
    }
}

/// Emit every oriented boundary segment of the grid.
fn segments(grid: &PixelGrid, connectivity: Connectivity) -> Vec<Segment> {
    let sample = |x: i64, y: i64| grid.is_solid(x - 1, y - 1);
    let center_solid = connectivity == Connectivity::Eight;
    let mut out = Vec::new();

    for cy in 0..=i64::from(grid.height()) {
        for cx in 0..=i64::from(grid.width()) {
            let code = (u8::from(sample(cx, cy)) << 3)
                | (u8::from(sample(cx + 1, cy)) << 2)
                | (u8::from(sample(cx + 1, cy + 1)) << 1)
                | u8::from(sample(cx, cy + 1));

            let edges = match code {
                5 | 10 => saddle_segments(code, center_solid),
                _ => CASES[usize::from(code)],
            };
            out.extend(
                edges
                    .iter()
                    .map(|&(a, b)| (midpoint(cx, cy, a), midpoint(cx, cy, b))),
            );
        }
    }
    out
}

/// Chain oriented segments into closed loops.
///
/// Returns loops in discovery order, each as a list of doubled-coordinate
/// keys without the closing duplicate. Chains that fail to close are
/// dropped.
fn chain(segments: &[Segment]) -> Vec<Vec<Key>> {
    let by_start: HashMap<Key, usize> = segments
        .iter()
        .enumerate()
        .map(|(i, &(start, _))| (start, i))
        .collect();

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        let mut keys = Vec::new();
        let mut current = first;
        let closed = loop {
            used[current] = true;
            let (start, end) = segments[current];
            keys.push(start);
            match by_start.get(&end) {
                Some(&next) if next == first => break true,
                Some(&next) if !used[next] => current = next,
                _ => break false,
            }
        };
        if closed {
            loops.push(keys);
        } else {
            tracing::debug!(length = keys.len(), "dropping open marching-squares chain");
        }
    }
    loops
}

/// Twice the signed area of a loop, in doubled coordinates.
///
/// Outer boundaries are positive; holes run the other way.
fn doubled_area(keys: &[Key]) -> i64 {
    keys.iter()
        .zip(keys.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
        .sum()
}

/// Trace the outer boundary as the longest outer loop.
///
/// Hole loops are skipped however long they are. Ties go to the loop
/// discovered first (top-most). Returns `None` when the grid has no solid
/// pixels.
#[must_use]
pub fn trace(grid: &PixelGrid, connectivity: Connectivity) -> Option<Contour> {
    let loops = chain(&segments(grid, connectivity));
    tracing::debug!(loops = loops.len(), "marching squares chained loops");

    let mut longest: Option<Vec<Key>> = None;
    for keys in loops.into_iter().filter(|keys| doubled_area(keys) > 0) {
        if longest.as_ref().is_none_or(|l| keys.len() > l.len()) {
            longest = Some(keys);
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "grid coordinates are small")]
    let points = longest?
        .into_iter()
        .map(|(x, y)| Point::new(x as f64 / 2.0, y as f64 / 2.0))
        .collect();
    Some(Contour::new(points))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::signed_area;

    fn bounds(contour: &Contour) -> (f64, f64, f64, f64) {
        contour.points().iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    #[test]
    fn empty_grid_has_no_contour() {
        assert!(trace(&PixelGrid::new(6, 6), Connectivity::Four).is_none());
    }

    #[test]
    fn single_pixel_is_a_diamond() {
        let grid = PixelGrid::from_fn(3, 3, |x, y| x == 1 && y == 1);
        let contour = trace(&grid, Connectivity::Four).unwrap();
        assert_eq!(
            contour.points(),
            &[
                Point::new(1.0, 1.5),
                Point::new(1.5, 1.0),
                Point::new(2.0, 1.5),
                Point::new(1.5, 2.0),
            ]
        );
        assert!((signed_area(contour.points()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rectangle_extent_matches_pixel_edges() {
        let grid = PixelGrid::from_fn(10, 8, |x, y| (2..9).contains(&x) && (1..5).contains(&y));
        let contour = trace(&grid, Connectivity::Four).unwrap();
        let (x0, y0, x1, y1) = bounds(&contour);
        assert!((x0 - 2.0).abs() < 1e-12 && (x1 - 9.0).abs() < 1e-12);
        assert!((y0 - 1.0).abs() < 1e-12 && (y1 - 5.0).abs() < 1e-12);
        // One vertex per boundary pixel edge.
        assert_eq!(contour.len(), 2 * (7 + 4));
    }

    #[test]
    fn region_touching_grid_border_is_closed() {
        let grid = PixelGrid::from_fn(4, 4, |_, _| true);
        let contour = trace(&grid, Connectivity::Four).unwrap();
        let (x0, y0, x1, y1) = bounds(&contour);
        assert_eq!((x0, y0, x1, y1), (0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn outer_loop_wins_over_hole() {
        let grid = PixelGrid::from_fn(12, 12, |x, y| {
            let outer = (1..11).contains(&x) && (1..11).contains(&y);
            let hole = (4..8).contains(&x) && (4..8).contains(&y);
            outer && !hole
        });
        let segs = segments(&grid, Connectivity::Four);
        assert_eq!(chain(&segs).len(), 2);

        let contour = trace(&grid, Connectivity::Four).unwrap();
        let (x0, _, x1, _) = bounds(&contour);
        assert!((x1 - x0 - 10.0).abs() < 1e-12);
        assert!(signed_area(contour.points()) > 0.0);
    }

    #[test]
    fn long_cavity_does_not_replace_outer_ring() {
        // 1px serpentine channel whose boundary is far longer than the
        // block's own.
        let channel = |x: u32, y: u32| {
            let row = y % 4 == 0 && (4..=36).contains(&y) && (4..=36).contains(&x);
            let turn_x = if (y / 4) % 2 == 0 { 4 } else { 36 };
            let turn = y % 4 != 0 && (5..36).contains(&y) && x == turn_x;
            row || turn
        };
        let grid = PixelGrid::from_fn(41, 41, |x, y| !channel(x, y));
        let loops = chain(&segments(&grid, Connectivity::Four));
        let hole = loops.iter().find(|keys| doubled_area(keys) < 0).unwrap();
        assert!(hole.len() > 4 * 41, "hole loop has {} points", hole.len());

        let contour = trace(&grid, Connectivity::Four).unwrap();
        assert_eq!(bounds(&contour), (0.0, 0.0, 41.0, 41.0));
        assert!(signed_area(contour.points()) > 1600.0);
    }

    #[test]
    fn saddle_follows_connectivity() {
        // Two pixels touching only at a corner.
        let grid = PixelGrid::from_fn(4, 4, |x, y| (x == 1 && y == 1) || (x == 2 && y == 2));
        let four = chain(&segments(&grid, Connectivity::Four));
        let eight = chain(&segments(&grid, Connectivity::Eight));
        assert_eq!(four.len(), 2, "4-connected pixels trace separately");
        assert_eq!(eight.len(), 1, "8-connected pixels trace as one loop");
        assert_eq!(eight[0].len(), 8);
    }

    #[test]
    fn every_segment_is_chained() {
        let grid = PixelGrid::from_fn(16, 16, |x, y| (x * 7 + y * 3) % 5 < 2);
        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let segs = segments(&grid, connectivity);
            let chained: usize = chain(&segs).iter().map(Vec::len).sum();
            assert_eq!(chained, segs.len(), "{connectivity:?}");
        }
    }
}
