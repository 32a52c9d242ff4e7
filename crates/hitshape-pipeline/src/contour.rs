//! Contour tracing: walk the outer boundary of the selected component.
//!
//! This module defines the [`ContourTracer`] trait for pluggable boundary
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! # Strategy pattern
//!
//! The two tracers produce slightly different geometry from the same
//! grid (Moore yields pixel centers, marching squares yields points on
//! pixel edges) but are interchangeable at the contract level: one
//! closed ring in a single rotational direction, or `None`.

use serde::{Deserialize, Serialize};

use crate::binarize::PixelGrid;
use crate::config::Connectivity;
use crate::types::Contour;

/// Selects which boundary tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourTracerKind {
    /// Moore-neighbor tracing over boundary pixels (8-connected walk).
    MooreNeighbor,

    /// Marching squares over 2×2 cells, segments chained into loops.
    ///
    /// Points sit on pixel edges, so a traced rectangle has exactly the
    /// rectangle's extent.
    #[default]
    MarchingSquares,
}

/// Trait for boundary tracing strategies.
///
/// Input: a binary grid holding one connected component.
/// Output: the outer boundary as a closed ring in grid coordinates, or
/// `None` when the grid has no boundary to follow. The minimum-length
/// check is left to the caller.
pub trait ContourTracer {
    /// Trace the outer boundary of the solid region.
    fn trace(&self, grid: &PixelGrid, connectivity: Connectivity) -> Option<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, grid: &PixelGrid, connectivity: Connectivity) -> Option<Contour> {
        match *self {
            Self::MooreNeighbor => crate::moore::trace(grid),
            Self::MarchingSquares => crate::marching::trace(grid, connectivity),
        }
    }
}
