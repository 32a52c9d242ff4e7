//! Shared types for the hitshape extraction pipeline.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded bitmaps
/// to the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in grid or image coordinates (+Y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Multiply both coordinates by `factor`.
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An ordered, closed ring of points.
///
/// The closing edge runs from the last point back to the first; the
/// first point is never repeated at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// The longer of the two axes.
    #[must_use]
    pub const fn longer(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// Axis-aligned integer rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column (inclusive).
    pub x: u32,
    /// Top row (inclusive).
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// A 1×1 box at `(x, y)`.
    #[must_use]
    pub const fn at(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
        }
    }

    /// Grow the box so it contains pixel `(x, y)`.
    pub const fn include(&mut self, x: u32, y: u32) {
        if x < self.x {
            self.width += self.x - x;
            self.x = x;
        } else if x >= self.x + self.width {
            self.width = x - self.x + 1;
        }
        if y < self.y {
            self.height += self.y - y;
            self.y = y;
        } else if y >= self.y + self.height {
            self.height = y - self.y + 1;
        }
    }

    /// Pixel area of the box.
    #[must_use]
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Size of the box.
    #[must_use]
    pub const fn dimensions(self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Polygon orientation, defined by the sign of the shoelace sum
/// `Σ(xᵢyᵢ₊₁ − xᵢ₊₁yᵢ) / 2`.
///
/// `Clockwise` means a negative signed area. With +Y pointing down this
/// is the ring that *looks* counter-clockwise on screen; the name follows
/// the math-convention sign so that engines with +Y up see it clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winding {
    /// Negative signed area.
    #[default]
    Clockwise,
    /// Positive signed area.
    CounterClockwise,
}

impl Winding {
    /// Whether a ring with this signed area already has this winding.
    #[must_use]
    pub fn matches(self, signed_area: f64) -> bool {
        match self {
            Self::Clockwise => signed_area <= 0.0,
            Self::CounterClockwise => signed_area >= 0.0,
        }
    }
}

/// Errors that escape the extraction boundary.
///
/// Geometric failures never appear here: they are reported through
/// [`ExtractionResult::Failed`](crate::ExtractionResult::Failed) with a
/// [`FailureReason`](crate::FailureReason) and a fallback shape.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Extraction configuration is invalid.
    #[error("invalid extraction configuration: {0}")]
    InvalidConfig(String),
}
