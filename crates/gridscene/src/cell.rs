//! Markers and per-cell marker bags

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Positions closer than this are considered the same marker slot
const POSITION_EPSILON: f32 = 1e-4;

/// A tagged, positioned socket in a generated level (e.g. "Wall", "Door").
///
/// Markers are value-like records: the processor copies them into cells,
/// mutates the copies, and emits a fresh array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Marker id, unique within one marker array
    pub id: i32,

    /// Semantic tag
    pub tag: String,

    /// World transform (rigid: rotation + translation)
    pub transform: Mat4,
}

impl Marker {
    /// Create a marker
    pub fn new(id: i32, tag: impl Into<String>, transform: Mat4) -> Self {
        Marker {
            id,
            tag: tag.into(),
            transform,
        }
    }

    /// Translation component of the marker transform
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Rotation component of the marker transform
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.transform.to_scale_rotation_translation();
        rotation
    }
}

/// Sub-tile classification within one grid cell.
///
/// A cell owns its ground tile, the two edges on its negative-X/negative-Z
/// sides (EdgeZ runs along Z on the cell's -X boundary, EdgeX along X on
/// the -Z boundary), and the corner where those edges meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Tile center
    Ground,

    /// Edge aligned with the X axis
    EdgeX,

    /// Edge aligned with the Z axis
    EdgeZ,

    /// Tile corner
    Corner,
}

impl CellKind {
    /// All four kinds, in the grid's canonical order
    pub const ALL: [CellKind; 4] = [
        CellKind::Ground,
        CellKind::EdgeX,
        CellKind::EdgeZ,
        CellKind::Corner,
    ];
}

/// One grid cell: up to four marker lists, keyed by cell kind.
///
/// Lists preserve insertion order; lookups by tag scan in that order, which
/// is what makes "first match wins" semantics deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    ground: Vec<Marker>,
    edge_x: Vec<Marker>,
    edge_z: Vec<Marker>,
    corner: Vec<Marker>,
}

impl GridCell {
    /// Markers of the given kind, in insertion order
    pub fn markers(&self, kind: CellKind) -> &[Marker] {
        match kind {
            CellKind::Ground => &self.ground,
            CellKind::EdgeX => &self.edge_x,
            CellKind::EdgeZ => &self.edge_z,
            CellKind::Corner => &self.corner,
        }
    }

    fn markers_mut(&mut self, kind: CellKind) -> &mut Vec<Marker> {
        match kind {
            CellKind::Ground => &mut self.ground,
            CellKind::EdgeX => &mut self.edge_x,
            CellKind::EdgeZ => &mut self.edge_z,
            CellKind::Corner => &mut self.corner,
        }
    }

    /// Add a marker of the given kind.
    ///
    /// No-op if a marker with the same tag at the same position already
    /// exists in that list (no two markers of the same tag may coexist at
    /// one kind/position).
    pub fn add(&mut self, marker: Marker, kind: CellKind) {
        let position = marker.position();
        let list = self.markers_mut(kind);
        let duplicate = list
            .iter()
            .any(|m| m.tag == marker.tag && m.position().abs_diff_eq(position, POSITION_EPSILON));
        if !duplicate {
            list.push(marker);
        }
    }

    /// Remove the first marker with this tag, no-op when absent
    pub fn remove(&mut self, tag: &str, kind: CellKind) {
        let list = self.markers_mut(kind);
        if let Some(index) = list.iter().position(|m| m.tag == tag) {
            list.remove(index);
        }
    }

    /// True if any marker with this tag exists at the given kind
    pub fn contains(&self, tag: &str, kind: CellKind) -> bool {
        self.markers(kind).iter().any(|m| m.tag == tag)
    }

    /// True if the cell holds no markers of any kind
    pub fn is_empty(&self) -> bool {
        self.ground.is_empty()
            && self.edge_x.is_empty()
            && self.edge_z.is_empty()
            && self.corner.is_empty()
    }
}
