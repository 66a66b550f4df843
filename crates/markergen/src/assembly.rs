//! Pattern assemblies and 90-degree rotation
//!
//! An assembly is a flattened, relocatable snapshot of a pattern's rules.
//! Rotating an assembly turns the whole stamp a quarter turn about the Y
//! axis: ground cells rotate about the grid origin, corners about the
//! half-cell pivot, and the two edge kinds swap (an X-aligned edge turned
//! 90 degrees runs along Z). Rotations chain, so the four orientations are
//! produced by rotating the previous one rather than the base each time.

use crate::pattern::Pattern;
use glam::{IVec2, Quat, Vec3};
use gridscene::CellKind;
use std::f32::consts::FRAC_PI_2;

/// One rule of an assembly, positioned in the stamp's local grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInstance {
    /// Cell offset relative to the stamp's base coordinate
    pub coord: IVec2,

    /// Slot kind this instance inspects (remapped under rotation)
    pub kind: CellKind,

    /// Index of the source rule in the pattern's rule list
    pub rule_index: usize,

    /// True when applying this instance places an asset at its cell
    pub insert_hint: bool,
}

/// A rotated, relocatable instantiation of a pattern's rule set
#[derive(Debug, Clone)]
pub struct PatternAssembly {
    /// Rule instances, in the pattern's rule order
    pub rules: Vec<RuleInstance>,

    /// Tight envelope of the rule coordinates (inclusive)
    pub bounds_min: IVec2,
    pub bounds_max: IVec2,

    /// Accumulated rotation angle in degrees
    pub rotation_angle_deg: f32,

    /// Number of quarter turns applied, 0..=3
    pub rotation_index: u32,
}

impl PatternAssembly {
    /// Flatten `pattern` into an unrotated assembly.
    ///
    /// The per-rule insert hint is the explicit hint OR-ed with "the rule's
    /// actions add a marker".
    pub fn generate(pattern: &Pattern) -> Self {
        let rules = pattern
            .rules
            .iter()
            .enumerate()
            .map(|(rule_index, rule)| RuleInstance {
                coord: rule.coord,
                kind: rule.kind,
                rule_index,
                insert_hint: rule.inserts_asset_here(),
            })
            .collect();

        let mut assembly = PatternAssembly {
            rules,
            bounds_min: IVec2::ZERO,
            bounds_max: IVec2::ZERO,
            rotation_angle_deg: 0.0,
            rotation_index: 0,
        };
        assembly.update_bounds();
        assembly
    }

    /// Produce this assembly turned one quarter turn further.
    pub fn rotate_90(&self) -> Self {
        let mut rotated = self.clone();
        rotated.rotation_angle_deg += 90.0;
        rotated.rotation_index = (rotated.rotation_index + 1) % 4;

        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        for rule in &mut rotated.rules {
            let (pre_pivot, post_pivot, new_kind) = match rule.kind {
                CellKind::Ground => (Vec3::ZERO, Vec3::ZERO, CellKind::Ground),
                CellKind::Corner => {
                    let pivot = Vec3::new(0.5, 0.0, 0.5);
                    (pivot, pivot, CellKind::Corner)
                }
                // An edge sits at the midpoint of a tile boundary; its
                // true position is half a cell off its integer coord
                CellKind::EdgeX => (
                    Vec3::new(0.0, 0.0, 0.5),
                    Vec3::new(0.5, 0.0, 0.0),
                    CellKind::EdgeZ,
                ),
                CellKind::EdgeZ => (
                    Vec3::new(0.5, 0.0, 0.0),
                    Vec3::new(0.0, 0.0, 0.5),
                    CellKind::EdgeX,
                ),
            };

            let old = Vec3::new(rule.coord.x as f32, 0.0, rule.coord.y as f32) - pre_pivot;
            let new = rotation * old + post_pivot;
            rule.coord = IVec2::new(new.x.round() as i32, new.z.round() as i32);
            rule.kind = new_kind;
        }

        rotated.update_bounds();
        rotated
    }

    /// Stamp footprint in cells (inclusive envelope)
    pub fn size(&self) -> IVec2 {
        self.bounds_max - self.bounds_min + IVec2::ONE
    }

    fn update_bounds(&mut self) {
        let Some(first) = self.rules.first() else {
            self.bounds_min = IVec2::ZERO;
            self.bounds_max = IVec2::ZERO;
            return;
        };
        let mut min = first.coord;
        let mut max = first.coord;
        for rule in &self.rules {
            min = min.min(rule.coord);
            max = max.max(rule.coord);
        }
        self.bounds_min = min;
        self.bounds_max = max;
    }
}

/// The 1 or 4 orientations of a pattern, base orientation first.
///
/// Rotations are chained: each entry is the previous one rotated a quarter
/// turn, keeping integer rounding consistent across the set.
pub fn build_assemblies(pattern: &Pattern) -> Vec<PatternAssembly> {
    let mut assemblies = vec![PatternAssembly::generate(pattern)];
    if pattern.rotate_to_fit {
        for _ in 0..3 {
            let rotated = assemblies[assemblies.len() - 1].rotate_90();
            assemblies.push(rotated);
        }
    }
    assemblies
}
