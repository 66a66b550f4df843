//! Elevation propagation across the marker grid
//!
//! Ground markers carry their elevation in their transform; cells without a
//! ground marker (the expanded margin, gaps in the layout) get a height by
//! flooding outward from the nearest seeded cells. Edge and corner slots
//! then take the max over the ground heights they touch, so a wall between
//! two tiles of different elevation sits at the higher one.

use crate::cell::CellKind;
use crate::grid::{CellGrid, MarkerGrid};
use glam::IVec2;
use std::collections::{HashSet, VecDeque};

const NEIGHBOR_DELTAS: [IVec2; 4] = [
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
];

/// Per-kind elevation steps for one cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellHeights {
    pub ground: i32,
    pub edge_x: i32,
    pub edge_z: i32,
    pub corner: i32,
}

impl CellHeights {
    /// Elevation step for the given kind
    pub fn height(&self, kind: CellKind) -> i32 {
        match kind {
            CellKind::Ground => self.ground,
            CellKind::EdgeX => self.edge_x,
            CellKind::EdgeZ => self.edge_z,
            CellKind::Corner => self.corner,
        }
    }
}

/// Elevation map over the same window as a [`MarkerGrid`]
#[derive(Debug, Clone)]
pub struct HeightGrid {
    cells: CellGrid<CellHeights>,
}

impl HeightGrid {
    /// Compute heights for every cell of `marker_grid`.
    ///
    /// Cells holding a ground marker seed their elevation from that
    /// marker's y position. Unseeded cells inherit from seeded ones via a
    /// breadth-first flood over 4-connected neighbors, first writer wins.
    /// Edges and corners aggregate the max over the ground cells sharing
    /// them (the neighbors on their negative-X/negative-Z sides).
    pub fn build(marker_grid: &MarkerGrid) -> Self {
        let world_offset = marker_grid.world_offset();
        let world_size = marker_grid.world_size();
        let mut cells: CellGrid<CellHeights> = CellGrid::new(world_offset, world_size);

        let cell_height = marker_grid.cell_height().max(1.0);

        // Seed from ground markers, scanning rows in order so the flood
        // visits seeds deterministically
        let mut queue: VecDeque<(IVec2, i32)> = VecDeque::new();
        let mut visited: HashSet<IVec2> = HashSet::new();
        for z in world_offset.y..world_offset.y + world_size.y {
            for x in world_offset.x..world_offset.x + world_size.x {
                let coord = IVec2::new(x, z);
                let Some(cell) = marker_grid.cell(coord) else {
                    continue;
                };
                let Some(ground) = cell.markers(CellKind::Ground).first() else {
                    continue;
                };
                let height = (ground.position().y / cell_height).round() as i32;
                if let Some(heights) = cells.get_mut(coord) {
                    heights.ground = height;
                }
                visited.insert(coord);
                queue.push_back((coord, height));
            }
        }

        // Flood ground heights into unseeded cells
        while let Some((coord, height)) = queue.pop_front() {
            for delta in NEIGHBOR_DELTAS {
                let neighbor = coord + delta;
                if !cells.is_valid(neighbor) || visited.contains(&neighbor) {
                    continue;
                }
                visited.insert(neighbor);
                if let Some(heights) = cells.get_mut(neighbor) {
                    heights.ground = height;
                }
                queue.push_back((neighbor, height));
            }
        }

        // Edges and corners take the max over adjacent ground cells. The
        // cell's edges sit on its -X / -Z boundaries, so the relevant
        // neighbors are at (0,-1), (-1,0) and (-1,-1).
        for z in world_offset.y..world_offset.y + world_size.y {
            for x in world_offset.x..world_offset.x + world_size.x {
                let coord = IVec2::new(x, z);
                let here = cells.get(coord).copied().unwrap_or_default().ground;
                let below = ground_at(&cells, coord + IVec2::new(0, -1), here);
                let left = ground_at(&cells, coord + IVec2::new(-1, 0), here);
                let diagonal = ground_at(&cells, coord + IVec2::new(-1, -1), here);

                let edge_x = here.max(below);
                let edge_z = here.max(left);
                let corner = edge_x.max(edge_z).max(diagonal);

                if let Some(heights) = cells.get_mut(coord) {
                    heights.edge_x = edge_x;
                    heights.edge_z = edge_z;
                    heights.corner = corner;
                }
            }
        }

        HeightGrid { cells }
    }

    /// Heights at `coord`, or `None` outside the window
    pub fn get(&self, coord: IVec2) -> Option<&CellHeights> {
        self.cells.get(coord)
    }
}

fn ground_at(cells: &CellGrid<CellHeights>, coord: IVec2, fallback: i32) -> i32 {
    cells.get(coord).map_or(fallback, |h| h.ground)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Marker;
    use glam::{Mat4, Vec3};

    const CELL: Vec3 = Vec3::new(4.0, 2.0, 4.0);

    fn ground_marker(x: i32, z: i32, y: f32) -> Marker {
        Marker::new(
            0,
            "Ground",
            Mat4::from_translation(Vec3::new(
                (x as f32 + 0.5) * CELL.x,
                y,
                (z as f32 + 0.5) * CELL.z,
            )),
        )
    }

    #[test]
    fn test_seeded_heights_from_ground_markers() {
        let markers = vec![ground_marker(0, 0, 0.0), ground_marker(1, 0, 4.0)];
        let grid = MarkerGrid::new(CELL, &markers, 0);
        let heights = HeightGrid::build(&grid);

        assert_eq!(heights.get(IVec2::new(0, 0)).unwrap().ground, 0);
        assert_eq!(heights.get(IVec2::new(1, 0)).unwrap().ground, 2);
    }

    #[test]
    fn test_flood_fills_expanded_margin() {
        let markers = vec![ground_marker(0, 0, 2.0)];
        let grid = MarkerGrid::new(CELL, &markers, 2);
        let heights = HeightGrid::build(&grid);

        // Every cell in the expanded window inherits the lone seed
        for z in -2..3 {
            for x in -2..3 {
                assert_eq!(
                    heights.get(IVec2::new(x, z)).unwrap().ground,
                    1,
                    "at ({x}, {z})"
                );
            }
        }
    }

    #[test]
    fn test_flood_first_writer_wins() {
        // Two seeds of different heights; the midpoint cell is closer to
        // neither, and must take whichever reaches it first (the earlier
        // seed in scan order, since BFS advances both fronts in lockstep).
        let markers = vec![ground_marker(0, 0, 0.0), ground_marker(4, 0, 4.0)];
        let grid = MarkerGrid::new(CELL, &markers, 0);
        let heights = HeightGrid::build(&grid);

        assert_eq!(heights.get(IVec2::new(1, 0)).unwrap().ground, 0);
        assert_eq!(heights.get(IVec2::new(3, 0)).unwrap().ground, 2);
        assert_eq!(heights.get(IVec2::new(2, 0)).unwrap().ground, 0);
    }

    #[test]
    fn test_edges_take_max_of_adjacent_ground() {
        // Cell (1,1) raised above its neighbors
        let mut markers = Vec::new();
        for z in 0..3 {
            for x in 0..3 {
                let y = if x == 1 && z == 1 { 4.0 } else { 0.0 };
                markers.push(ground_marker(x, z, y));
            }
        }
        let grid = MarkerGrid::new(CELL, &markers, 0);
        let heights = HeightGrid::build(&grid);

        // The raised cell's own -X/-Z edges sit at its height
        let raised = heights.get(IVec2::new(1, 1)).unwrap();
        assert_eq!(raised.ground, 2);
        assert_eq!(raised.edge_x, 2);
        assert_eq!(raised.edge_z, 2);
        assert_eq!(raised.corner, 2);

        // The +X neighbor's -X edge borders the raised cell
        let right = heights.get(IVec2::new(2, 1)).unwrap();
        assert_eq!(right.ground, 0);
        assert_eq!(right.edge_z, 2);
        assert_eq!(right.edge_x, 0);

        // The +Z neighbor's -Z edge borders the raised cell
        let above = heights.get(IVec2::new(1, 2)).unwrap();
        assert_eq!(above.edge_x, 2);
        assert_eq!(above.edge_z, 0);

        // The diagonal neighbor shares only the corner
        let diagonal = heights.get(IVec2::new(2, 2)).unwrap();
        assert_eq!(diagonal.edge_x, 0);
        assert_eq!(diagonal.edge_z, 0);
        assert_eq!(diagonal.corner, 2);
    }

    #[test]
    fn test_height_accessor_by_kind() {
        let heights = CellHeights {
            ground: 1,
            edge_x: 2,
            edge_z: 3,
            corner: 4,
        };
        assert_eq!(heights.height(CellKind::Ground), 1);
        assert_eq!(heights.height(CellKind::EdgeX), 2);
        assert_eq!(heights.height(CellKind::EdgeZ), 3);
        assert_eq!(heights.height(CellKind::Corner), 4);
    }
}
