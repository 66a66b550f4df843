//! Gridscene crate - spatial grid model for scene markers
//!
//! A generated level is described by a flat array of tagged markers in
//! world space. This crate bins those markers into a 2D cell grid (each
//! cell holding ground, edge and corner slots), classifies world positions
//! into cell slots and back, and derives per-cell elevation by flooding
//! heights outward from ground markers.

mod cell;
mod grid;
mod heights;

pub use cell::{CellKind, GridCell, Marker};
pub use grid::{CellGrid, CellOccupancy, MarkerGrid, OccupancyGrid, EDGE_EPSILON};
pub use heights::{CellHeights, HeightGrid};
