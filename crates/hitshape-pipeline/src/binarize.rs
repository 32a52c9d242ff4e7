//! Alpha binarization and morphological clean-up.
//!
//! Thresholds the alpha channel of the analysis buffer into a binary
//! [`PixelGrid`]. Optional dilation keeps thin protrusions alive on a
//! coarse grid; optional erosion strips anti-aliasing halos. Both use the
//! `L∞` norm, so each iteration is one 3×3 (8-neighborhood) pass.
//!
//! All counts here are in analysis-grid pixels, not source pixels.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;

/// Grid value for a solid pixel.
pub const SOLID: u8 = 255;

/// A binary solid/empty grid at analysis resolution.
///
/// Backed by a `GrayImage` holding only `0` and [`SOLID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid(GrayImage);

impl PixelGrid {
    /// An all-empty grid.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Build a grid from a predicate over pixel coordinates.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut solid: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            Luma([if solid(x, y) { SOLID } else { 0 }])
        }))
    }

    /// Grid width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Grid height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Whether `(x, y)` is solid. Out-of-bounds coordinates are empty.
    #[must_use]
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width() && y < self.height() => {
                self.0.get_pixel(x, y)[0] == SOLID
            }
            _ => false,
        }
    }

    /// Mark `(x, y)` solid or empty.
    pub fn set(&mut self, x: u32, y: u32, solid: bool) {
        self.0.put_pixel(x, y, Luma([if solid { SOLID } else { 0 }]));
    }

    /// Number of solid pixels.
    #[must_use]
    pub fn solid_count(&self) -> u64 {
        self.0.as_raw().iter().filter(|&&v| v == SOLID).count() as u64
    }

    /// Borrow the underlying raster.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Threshold the alpha channel: solid iff `alpha > threshold`.
#[must_use]
pub fn binarize(rgba: &RgbaImage, threshold: u8) -> PixelGrid {
    PixelGrid::from_fn(rgba.width(), rgba.height(), |x, y| {
        rgba.get_pixel(x, y)[3] > threshold
    })
}

/// Surround the grid with `margin` empty pixels on every side.
///
/// Morphology needs the room: dilation must be able to grow past the
/// crop edge and erosion must see empty space beyond it.
#[must_use]
pub fn pad(grid: &PixelGrid, margin: u32) -> PixelGrid {
    if margin == 0 {
        return grid.clone();
    }
    let mut out = GrayImage::new(grid.width() + 2 * margin, grid.height() + 2 * margin);
    image::imageops::replace(&mut out, grid.as_image(), i64::from(margin), i64::from(margin));
    PixelGrid(out)
}

/// Grow every solid pixel's 8-neighborhood `iterations` times.
#[must_use]
pub fn dilate(grid: &PixelGrid, iterations: u8) -> PixelGrid {
    if iterations == 0 {
        return grid.clone();
    }
    PixelGrid(imageproc::morphology::dilate(grid.as_image(), Norm::LInf, iterations))
}

/// Strip `iterations` pixels from every edge of every solid region.
#[must_use]
pub fn erode(grid: &PixelGrid, iterations: u8) -> PixelGrid {
    if iterations == 0 {
        return grid.clone();
    }
    PixelGrid(imageproc::morphology::erode(grid.as_image(), Norm::LInf, iterations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32, lo: u32, hi: u32) -> PixelGrid {
        PixelGrid::from_fn(size, size, |x, y| (lo..hi).contains(&x) && (lo..hi).contains(&y))
    }

    #[test]
    fn threshold_is_strict() {
        let rgba = RgbaImage::from_fn(3, 1, |x, _| image::Rgba([0, 0, 0, [7, 8, 9][x as usize]]));
        let grid = binarize(&rgba, 8);
        assert!(!grid.is_solid(0, 0));
        assert!(!grid.is_solid(1, 0));
        assert!(grid.is_solid(2, 0));
    }

    #[test]
    fn out_of_bounds_is_empty() {
        let grid = PixelGrid::from_fn(2, 2, |_, _| true);
        assert!(grid.is_solid(0, 0));
        assert!(!grid.is_solid(-1, 0));
        assert!(!grid.is_solid(0, 2));
        assert!(!grid.is_solid(2, 1));
    }

    #[test]
    fn pad_shifts_content() {
        let grid = PixelGrid::from_fn(1, 1, |_, _| true);
        let padded = pad(&grid, 2);
        assert_eq!((padded.width(), padded.height()), (5, 5));
        assert!(padded.is_solid(2, 2));
        assert_eq!(padded.solid_count(), 1);
    }

    #[test]
    fn dilate_grows_by_one_ring_per_iteration() {
        let grid = square(9, 4, 5);
        assert_eq!(dilate(&grid, 1).solid_count(), 9);
        assert_eq!(dilate(&grid, 2).solid_count(), 25);
    }

    #[test]
    fn dilate_bridges_a_one_pixel_gap() {
        let grid = PixelGrid::from_fn(7, 1, |x, _| x == 2 || x == 4);
        let grown = dilate(&grid, 1);
        assert!(grown.is_solid(3, 0));
    }

    #[test]
    fn erode_strips_the_rim() {
        let grid = square(10, 2, 8);
        let thinned = erode(&grid, 1);
        assert_eq!(thinned.solid_count(), 16);
        assert!(!thinned.is_solid(2, 2));
        assert!(thinned.is_solid(3, 3));
    }

    #[test]
    fn erode_removes_thin_halo() {
        let grid = PixelGrid::from_fn(10, 10, |x, _| x == 5);
        assert_eq!(erode(&grid, 1).solid_count(), 0);
    }

    #[test]
    fn erode_after_pad_clears_edge_touching_regions() {
        let grid = PixelGrid::from_fn(4, 4, |_, _| true);
        let thinned = erode(&pad(&grid, 1), 1);
        assert_eq!(thinned.solid_count(), 4);
    }

    #[test]
    fn zero_iterations_is_identity() {
        let grid = square(6, 1, 4);
        assert_eq!(dilate(&grid, 0), grid);
        assert_eq!(erode(&grid, 0), grid);
    }
}
