//! Moore-neighbor boundary tracing.
//!
//! Starts at the top-left-most solid pixel (always a boundary pixel,
//! since its upper neighbor is empty) and walks the boundary keeping a
//! backtrack neighbor: at each step the 8 neighbors are scanned
//! clockwise starting just past the backtrack, the first solid one
//! becomes the next pixel, and the neighbor scanned just before it
//! becomes the new backtrack.
//!
//! The walk stops when it is about to repeat its very first move
//! (start pixel → second pixel). Stopping on the first return to the
//! start pixel alone would close figure-eight shapes prematurely.

use crate::binarize::PixelGrid;
use crate::types::{Contour, Point};

/// 8-neighborhood, clockwise on screen (+Y down), starting north.
const DIRECTIONS: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Index of west in [`DIRECTIONS`].
const WEST: usize = 6;

/// Steps allowed per grid pixel before the walk is abandoned.
const STEP_BUDGET_PER_PIXEL: usize = 8;

type Pixel = (i64, i64);

/// Trace the outer boundary as a ring of pixel centers.
///
/// Returns `None` for an empty grid, an isolated single pixel, or a walk
/// that does not close within the step budget.
#[must_use]
pub fn trace(grid: &PixelGrid) -> Option<Contour> {
    let budget = grid.width() as usize * grid.height() as usize * STEP_BUDGET_PER_PIXEL;
    trace_within(grid, budget)
}

fn trace_within(grid: &PixelGrid, budget: usize) -> Option<Contour> {
    let start = first_solid(grid)?;
    // Scanning row-major, the west neighbor of the first hit is empty.
    let (second, mut backtrack) = step(grid, start, WEST)?;

    let mut points = vec![center(start)];
    let mut current = second;
    let mut steps = 0usize;

    loop {
        steps += 1;
        if steps > budget {
            tracing::warn!(steps, "moore trace exceeded its step budget");
            return None;
        }

        let (next, next_backtrack) = step(grid, current, backtrack)?;
        if current == start && next == second {
            break;
        }
        points.push(center(current));
        current = next;
        backtrack = next_backtrack;
    }

    Some(Contour::new(points))
}

/// First solid pixel in row-major order.
fn first_solid(grid: &PixelGrid) -> Option<Pixel> {
    (0..i64::from(grid.height()))
        .flat_map(|y| (0..i64::from(grid.width())).map(move |x| (x, y)))
        .find(|&(x, y)| grid.is_solid(x, y))
}

/// One Moore step from `pixel` with the backtrack at direction
/// `backtrack`. Returns the next pixel and the backtrack direction
/// relative to it, or `None` if `pixel` has no solid neighbor.
fn step(grid: &PixelGrid, pixel: Pixel, backtrack: usize) -> Option<(Pixel, usize)> {
    for k in 1..=8 {
        let dir = (backtrack + k) % 8;
        let (dx, dy) = DIRECTIONS[dir];
        let candidate = (pixel.0 + dx, pixel.1 + dy);
        if grid.is_solid(candidate.0, candidate.1) {
            let (px, py) = DIRECTIONS[(backtrack + k - 1) % 8];
            let previous = (pixel.0 + px, pixel.1 + py);
            let relative = (previous.0 - candidate.0, previous.1 - candidate.1);
            let new_backtrack = DIRECTIONS.iter().position(|&d| d == relative)?;
            return Some((candidate, new_backtrack));
        }
    }
    None
}

#[allow(clippy::cast_precision_loss, reason = "grid coordinates are small")]
fn center((x, y): Pixel) -> Point {
    Point::new(x as f64 + 0.5, y as f64 + 0.5)
}
