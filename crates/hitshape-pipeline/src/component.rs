//! Connected-component selection.
//!
//! Keeps only the largest connected region of solid pixels so stray
//! anti-aliasing islands and small decorations never hijack the trace.
//!
//! The flood fill is iterative (queue-based); analysis grids of several
//! hundred pixels per side would overflow the stack with recursion.

use std::collections::VecDeque;

use crate::binarize::PixelGrid;
use crate::config::Connectivity;
use crate::types::BoundingBox;

const FOUR: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const EIGHT: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

impl Connectivity {
    const fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

/// A maximal connected set of solid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedComponent {
    /// 1-based label in discovery order (row-major scan).
    pub label: u32,
    /// Number of pixels in the component.
    pub pixel_count: u64,
    /// Bounding box in grid coordinates.
    pub bounds: BoundingBox,
}

/// The surviving component, isolated on its own cropped grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Grid cropped to `bounds`, holding only the selected component.
    pub grid: PixelGrid,
    /// Bounding box of the component in the input grid.
    pub bounds: BoundingBox,
    /// Number of components found in the input grid.
    pub component_count: usize,
    /// Pixel count of the selected component.
    pub selected_pixel_count: u64,
}

impl Selection {
    /// Selected pixels divided by bounding-box area.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "pixel counts are far below 2^52")]
    pub fn solidity(&self) -> f64 {
        self.selected_pixel_count as f64 / self.bounds.area() as f64
    }
}

/// Label every connected component.
///
/// Returns the per-pixel label map (row-major, `0` = empty) and the
/// components in discovery order.
#[must_use]
pub fn label_components(
    grid: &PixelGrid,
    connectivity: Connectivity,
) -> (Vec<u32>, Vec<ConnectedComponent>) {
    let (width, height) = (grid.width(), grid.height());
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    let mut labels = vec![0u32; width as usize * height as usize];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            if labels[index(x, y)] != 0 || !grid.is_solid(i64::from(x), i64::from(y)) {
                continue;
            }

            let label = u32::try_from(components.len() + 1).unwrap_or(u32::MAX);
            let mut component = ConnectedComponent {
                label,
                pixel_count: 0,
                bounds: BoundingBox::at(x, y),
            };
            labels[index(x, y)] = label;
            queue.push_back((x, y));

            while let Some((cx, cy)) = queue.pop_front() {
                component.pixel_count += 1;
                component.bounds.include(cx, cy);

                for &(dx, dy) in connectivity.offsets() {
                    let nx = i64::from(cx) + dx;
                    let ny = i64::from(cy) + dy;
                    if !grid.is_solid(nx, ny) {
                        continue;
                    }
                    // is_solid() guarantees both are in bounds.
                    let (Ok(nx), Ok(ny)) = (u32::try_from(nx), u32::try_from(ny)) else {
                        continue;
                    };
                    let slot = &mut labels[index(nx, ny)];
                    if *slot == 0 {
                        *slot = label;
                        queue.push_back((nx, ny));
                    }
                }
            }

            components.push(component);
        }
    }

    (labels, components)
}

/// Find all connected components of solid pixels.
#[must_use]
pub fn components(grid: &PixelGrid, connectivity: Connectivity) -> Vec<ConnectedComponent> {
    label_components(grid, connectivity).1
}

/// Keep only the largest component, cropped to its bounding box.
///
/// Ties go to the component discovered first in row-major order.
/// Returns `None` when the grid has no solid pixels.
#[must_use]
pub fn select_largest(grid: &PixelGrid, connectivity: Connectivity) -> Option<Selection> {
    let (labels, components) = label_components(grid, connectivity);

    let mut best: Option<&ConnectedComponent> = None;
    for component in &components {
        if best.is_none_or(|b| component.pixel_count > b.pixel_count) {
            best = Some(component);
        }
    }
    let best = *best?;

    let width = grid.width() as usize;
    let bounds = best.bounds;
    let cropped = PixelGrid::from_fn(bounds.width, bounds.height, |x, y| {
        let gx = (bounds.x + x) as usize;
        let gy = (bounds.y + y) as usize;
        labels[gy * width + gx] == best.label
    });

    tracing::debug!(
        components = components.len(),
        selected = best.pixel_count,
        "selected largest component"
    );

    Some(Selection {
        grid: cropped,
        bounds,
        component_count: components.len(),
        selected_pixel_count: best.pixel_count,
    })
}
