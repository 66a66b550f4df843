//! Dense grid storage and the marker grid
//!
//! All grids are rectangular windows `[world_offset, world_offset +
//! world_size)` over integer cell coordinates, backed by row-major dense
//! storage. Out-of-window lookups return `None` — absence is data
//! ("no markers here"), never an error.

use crate::cell::{CellKind, GridCell, Marker};
use glam::{IVec2, Vec2, Vec3};

/// Half-width of the tolerance band used when classifying a world position
/// against a tile boundary. The band is symmetric: a residual this close to
/// either side of a boundary counts as on the boundary.
pub const EDGE_EPSILON: f32 = 1e-2;

/// Dense 2D storage over a coordinate window.
#[derive(Debug, Clone)]
pub struct CellGrid<T> {
    world_offset: IVec2,
    world_size: IVec2,
    cells: Vec<T>,
}

impl<T: Default> CellGrid<T> {
    /// Create a grid covering `[world_offset, world_offset + world_size)`,
    /// every cell default-initialized.
    pub fn new(world_offset: IVec2, world_size: IVec2) -> Self {
        let count = (world_size.x.max(0) * world_size.y.max(0)) as usize;
        let mut cells = Vec::with_capacity(count);
        cells.resize_with(count, T::default);
        CellGrid {
            world_offset,
            world_size,
            cells,
        }
    }

    /// Lower corner of the window (inclusive)
    pub fn world_offset(&self) -> IVec2 {
        self.world_offset
    }

    /// Extent of the window
    pub fn world_size(&self) -> IVec2 {
        self.world_size
    }

    /// True if `coord` lies inside the window
    pub fn is_valid(&self, coord: IVec2) -> bool {
        coord.x >= self.world_offset.x
            && coord.x < self.world_offset.x + self.world_size.x
            && coord.y >= self.world_offset.y
            && coord.y < self.world_offset.y + self.world_size.y
    }

    /// Cell at `coord`, or `None` outside the window
    pub fn get(&self, coord: IVec2) -> Option<&T> {
        if self.is_valid(coord) {
            Some(&self.cells[self.index(coord)])
        } else {
            None
        }
    }

    /// Mutable cell at `coord`, or `None` outside the window
    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut T> {
        if self.is_valid(coord) {
            let index = self.index(coord);
            Some(&mut self.cells[index])
        } else {
            None
        }
    }

    /// Iterate cells in row-major order (z rows outer, x inner)
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    fn index(&self, coord: IVec2) -> usize {
        let local = coord - self.world_offset;
        (self.world_size.x * local.y + local.x) as usize
    }
}

/// Per-kind occupancy flags for one cell, valid for a single processing
/// pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellOccupancy {
    ground: bool,
    edge_x: bool,
    edge_z: bool,
    corner: bool,
}

impl CellOccupancy {
    /// True if an asset was already placed at this kind during the pass
    pub fn is_occupied(&self, kind: CellKind) -> bool {
        match kind {
            CellKind::Ground => self.ground,
            CellKind::EdgeX => self.edge_x,
            CellKind::EdgeZ => self.edge_z,
            CellKind::Corner => self.corner,
        }
    }

    /// Mark this kind as occupied (or not)
    pub fn set_occupied(&mut self, kind: CellKind, value: bool) {
        match kind {
            CellKind::Ground => self.ground = value,
            CellKind::EdgeX => self.edge_x = value,
            CellKind::EdgeZ => self.edge_z = value,
            CellKind::Corner => self.corner = value,
        }
    }
}

/// The per-pass occupancy map
pub type OccupancyGrid = CellGrid<CellOccupancy>;

/// The scene's marker set binned into a cell grid.
///
/// Built once per processing pass from a flat marker array; the window is
/// the marker extent in cell units, optionally expanded symmetrically by a
/// domain-expansion margin so patterns can match just outside the authored
/// area.
#[derive(Debug, Clone)]
pub struct MarkerGrid {
    cells: CellGrid<GridCell>,
    cell_size: Vec2,
    cell_height: f32,
    next_marker_id: i32,
}

impl MarkerGrid {
    /// Bin `markers` into a fresh grid.
    ///
    /// `cell_size` is the 3D tile size; its x/z become the cell footprint
    /// and its y the height of one elevation step. `bounds_expansion`
    /// widens the window by that many cells on all four sides.
    pub fn new(cell_size: Vec3, markers: &[Marker], bounds_expansion: i32) -> Self {
        let cell_size_2d = Vec2::new(cell_size.x, cell_size.z);

        let (mut bounds_min, mut bounds_max) = if let Some(first) = markers.first() {
            let p = first.position();
            (Vec2::new(p.x, p.z), Vec2::new(p.x, p.z))
        } else {
            (Vec2::ZERO, Vec2::ZERO)
        };
        for marker in markers {
            let p = marker.position();
            bounds_min = bounds_min.min(Vec2::new(p.x, p.z));
            bounds_max = bounds_max.max(Vec2::new(p.x, p.z));
        }

        if cell_size_2d.x > 0.0 && cell_size_2d.y > 0.0 {
            bounds_min /= cell_size_2d;
            bounds_max /= cell_size_2d;
        } else {
            bounds_min = Vec2::ZERO;
            bounds_max = Vec2::ZERO;
        }

        let start = IVec2::new(bounds_min.x.floor() as i32, bounds_min.y.floor() as i32);
        let end = IVec2::new(bounds_max.x.floor() as i32, bounds_max.y.floor() as i32);

        let world_offset = start - IVec2::splat(bounds_expansion);
        let world_size = end - start + IVec2::ONE + IVec2::splat(bounds_expansion) * 2;

        let mut grid = MarkerGrid {
            cells: CellGrid::new(world_offset, world_size),
            cell_size: cell_size_2d,
            cell_height: cell_size.y,
            next_marker_id: markers.len() as i32,
        };

        for marker in markers {
            let (coord, kind) = grid.world_to_cell(marker.position());
            if let Some(cell) = grid.cells.get_mut(coord) {
                cell.add(marker.clone(), kind);
            }
        }

        grid
    }

    /// Lower corner of the window (inclusive)
    pub fn world_offset(&self) -> IVec2 {
        self.cells.world_offset()
    }

    /// Extent of the window
    pub fn world_size(&self) -> IVec2 {
        self.cells.world_size()
    }

    /// Cell footprint (x/z of the tile size)
    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// Height of one elevation step
    pub fn cell_height(&self) -> f32 {
        self.cell_height
    }

    /// Cell at `coord`, or `None` outside the window
    pub fn cell(&self, coord: IVec2) -> Option<&GridCell> {
        self.cells.get(coord)
    }

    /// Mutable cell at `coord`, or `None` outside the window
    pub fn cell_mut(&mut self, coord: IVec2) -> Option<&mut GridCell> {
        self.cells.get_mut(coord)
    }

    /// True if `coord` lies inside the window
    pub fn is_valid(&self, coord: IVec2) -> bool {
        self.cells.is_valid(coord)
    }

    /// Hand out a fresh marker id (seeded past the input array's length)
    pub fn next_marker_id(&mut self) -> i32 {
        let id = self.next_marker_id;
        self.next_marker_id += 1;
        id
    }

    /// Classify a world position into a cell coordinate and kind.
    ///
    /// The fractional offset within the cell decides the kind: on both
    /// boundaries ⇒ Corner, mid-X on the Z boundary ⇒ EdgeX, mid-Z on the
    /// X boundary ⇒ EdgeZ, otherwise Ground. Residuals within
    /// [`EDGE_EPSILON`] of 1.0 snap to the next cell so the tolerance band
    /// is symmetric around every boundary.
    pub fn world_to_cell(&self, position: Vec3) -> (IVec2, CellKind) {
        if self.cell_size.x <= 0.0 || self.cell_size.y <= 0.0 {
            return (IVec2::ZERO, CellKind::Ground);
        }

        let coord_f = Vec2::new(position.x, position.z) / self.cell_size;
        let mut coord = IVec2::new(coord_f.x.floor() as i32, coord_f.y.floor() as i32);
        let mut dx = coord_f.x - coord.x as f32;
        let mut dz = coord_f.y - coord.y as f32;

        if dx > 1.0 - EDGE_EPSILON {
            coord.x += 1;
            dx = 0.0;
        }
        if dz > 1.0 - EDGE_EPSILON {
            coord.y += 1;
            dz = 0.0;
        }

        let near = |a: f32, b: f32| (a - b).abs() < EDGE_EPSILON;
        let kind = if near(dx, 0.0) && near(dz, 0.0) {
            CellKind::Corner
        } else if near(dx, 0.5) && near(dz, 0.0) {
            CellKind::EdgeX
        } else if near(dx, 0.0) && near(dz, 0.5) {
            CellKind::EdgeZ
        } else {
            CellKind::Ground
        };

        (coord, kind)
    }

    /// World position of a cell slot: Ground at the tile center, edges at
    /// their boundary midpoints, Corner at the tile origin. `coord_y` is
    /// the elevation step.
    pub fn cell_to_world(&self, coord: IVec2, coord_y: i32, kind: CellKind) -> Vec3 {
        let offset = match kind {
            CellKind::Ground => Vec2::new(0.5, 0.5),
            CellKind::EdgeX => Vec2::new(0.5, 0.0),
            CellKind::EdgeZ => Vec2::new(0.0, 0.5),
            CellKind::Corner => Vec2::ZERO,
        };
        let pos_2d = (Vec2::new(coord.x as f32, coord.y as f32) + offset) * self.cell_size;
        Vec3::new(pos_2d.x, coord_y as f32 * self.cell_height, pos_2d.y)
    }

    /// Serialize the grid back into a flat marker array.
    ///
    /// Cells are visited in row-major order; within a cell the kind order
    /// is Ground, Corner, EdgeX, EdgeZ. Ids are reassigned 0-based
    /// sequential so the output is stable regardless of insertion history.
    pub fn flatten(&self) -> Vec<Marker> {
        let mut result = Vec::new();
        for cell in self.cells.iter() {
            for kind in [
                CellKind::Ground,
                CellKind::Corner,
                CellKind::EdgeX,
                CellKind::EdgeZ,
            ] {
                result.extend_from_slice(cell.markers(kind));
            }
        }
        for (index, marker) in result.iter_mut().enumerate() {
            marker.id = index as i32;
        }
        result
    }
}
