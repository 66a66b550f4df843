//! Match/apply processor
//!
//! Drives one pattern over one marker set: builds the grid and height map,
//! enumerates every placement of every assembly over the window, filters
//! placements through the occupancy map, the same-height constraint and the
//! per-rule condition VM, then applies the surviving placements' actions
//! with a probability roll and serializes the mutated grid back to a flat
//! marker array.

use crate::assembly::{build_assemblies, PatternAssembly};
use crate::pattern::{GeneratorAsset, Pattern};
use crate::rng::{shuffle, RandomStream};
use crate::script::{RuleScript, ScriptContext, ScriptInstanceCache};
use crate::source::MarkerSource;
use glam::{IVec2, Mat4, Quat, Vec3};
use gridscene::{CellKind, HeightGrid, Marker, MarkerGrid, OccupancyGrid};
use rulevm::{ActionInfo, VmApi};
use std::any::Any;
use std::collections::{HashMap, HashSet};

/// One trial overlay of an assembly at a base coordinate
#[derive(Debug, Clone, Copy)]
struct Candidate {
    base: IVec2,
    assembly: usize,
}

/// Grid-backed marker generation processor.
///
/// One instance serves a whole build batch; the script cache persists
/// across [`process`](MarkerGenProcessor::process) calls and is dropped by
/// [`release`](MarkerGenProcessor::release).
pub struct MarkerGenProcessor {
    level_transform: Mat4,
    grid_size: Vec3,
    script_cache: ScriptInstanceCache,
    user_data: Option<Box<dyn Any>>,
}

impl MarkerGenProcessor {
    /// Create a processor for a level placed at `level_transform` with the
    /// given 3D tile size.
    pub fn new(level_transform: Mat4, grid_size: Vec3) -> Self {
        MarkerGenProcessor {
            level_transform,
            grid_size,
            script_cache: ScriptInstanceCache::new(),
            user_data: None,
        }
    }

    /// Register a scripted condition class
    pub fn register_script(
        &mut self,
        class_name: impl Into<String>,
        factory: impl Fn() -> Box<dyn RuleScript> + 'static,
    ) {
        self.script_cache.register(class_name, factory);
    }

    /// Attach caller-owned collaborators, handed to scripts uninterpreted
    pub fn set_user_data(&mut self, user_data: Box<dyn Any>) {
        self.user_data = Some(user_data);
    }

    /// Drop cached script instances. Call once after a build batch.
    pub fn release(&mut self) {
        self.script_cache.release();
    }

    /// Run one pattern over `markers`.
    ///
    /// Returns the replacement marker array, or `None` when the pattern has
    /// nothing executable and the input should be kept as is.
    pub fn process(
        &mut self,
        pattern: &Pattern,
        markers: &[Marker],
        rng: &mut dyn RandomStream,
    ) -> Option<Vec<Marker>> {
        if !pattern.has_executable_rule() {
            return None;
        }

        let assemblies = build_assemblies(pattern);

        // Bring markers into level-local space; all grid math happens there
        let inverse = self.level_transform.inverse();
        let local_markers: Vec<Marker> = markers
            .iter()
            .map(|m| Marker::new(m.id, m.tag.clone(), inverse * m.transform))
            .collect();

        let mut grid = MarkerGrid::new(self.grid_size, &local_markers, pattern.domain_expansion);
        let heights = HeightGrid::build(&grid);
        let mut occupancy = OccupancyGrid::new(grid.world_offset(), grid.world_size());

        let mut candidates = Vec::new();
        for (index, assembly) in assemblies.iter().enumerate() {
            push_candidates(assembly, index, &grid, &mut candidates);
        }

        if pattern.randomize_fitting_order {
            shuffle(&mut candidates, rng);
        }

        let mut matched = Vec::new();
        if pattern.probability > 0.0 {
            for candidate in &candidates {
                let assembly = &assemblies[candidate.assembly];
                if self.should_execute(candidate.base, assembly, pattern, &occupancy, &grid, &heights)
                {
                    matched.push(*candidate);
                    mark_occupancy(candidate.base, assembly, &mut occupancy);
                }
            }
        }

        tracing::debug!(
            pattern = %pattern.name,
            candidates = candidates.len(),
            matched = matched.len(),
            "pattern matching complete"
        );

        for candidate in &matched {
            if rng.next_float() <= pattern.probability {
                execute_pattern(
                    candidate.base,
                    &assemblies[candidate.assembly],
                    pattern,
                    &mut grid,
                    &heights,
                );
            }
        }

        let mut result = grid.flatten();
        for marker in &mut result {
            marker.transform = self.level_transform * marker.transform;
        }
        Some(result)
    }

    /// Run every pattern of `asset` in order, feeding each pattern's output
    /// to the next, then write the final array back and release the script
    /// cache.
    pub fn process_all(
        &mut self,
        asset: &GeneratorAsset,
        source: &mut dyn MarkerSource,
        rng: &mut dyn RandomStream,
    ) {
        let mut markers = source.get_markers();
        for pattern in &asset.patterns {
            if let Some(output) = self.process(pattern, &markers, rng) {
                markers = output;
            }
        }
        source.set_markers(markers);
        self.release();
    }

    fn should_execute(
        &mut self,
        base: IVec2,
        assembly: &PatternAssembly,
        pattern: &Pattern,
        occupancy: &OccupancyGrid,
        grid: &MarkerGrid,
        heights: &HeightGrid,
    ) -> bool {
        // Reject placements that would insert into an already-claimed slot
        if !pattern.allow_insertion_overlaps {
            for rule in &assembly.rules {
                if !rule.insert_hint {
                    continue;
                }
                let occupied = occupancy
                    .get(base + rule.coord)
                    .is_some_and(|cell| cell.is_occupied(rule.kind));
                if occupied {
                    return false;
                }
            }
        }

        // Every constrained tag must sit at one elevation across the stamp
        if !pattern.same_height_tags.is_empty() {
            let tags: HashSet<&str> = pattern.same_height_tags.iter().map(String::as_str).collect();
            let cell_height = grid.cell_height().max(1.0);
            let mut tag_heights: HashMap<&str, i32> = HashMap::new();
            for rule in &assembly.rules {
                let Some(cell) = grid.cell(base + rule.coord) else {
                    continue;
                };
                for marker in cell.markers(rule.kind) {
                    if !tags.contains(marker.tag.as_str()) {
                        continue;
                    }
                    let coord_y = (marker.position().y / cell_height).round() as i32;
                    match tag_heights.get(marker.tag.as_str()) {
                        Some(existing) if *existing != coord_y => return false,
                        Some(_) => {}
                        None => {
                            tag_heights.insert(marker.tag.as_str(), coord_y);
                        }
                    }
                }
            }
        }

        // All rule conditions must pass at their cells
        for rule in &assembly.rules {
            let program = &pattern.rules[rule.rule_index].program;
            let mut api = GridVmApi {
                coord: base + rule.coord,
                kind: rule.kind,
                grid,
                heights,
                level_transform: self.level_transform,
                grid_size: self.grid_size,
                script_cache: &mut self.script_cache,
                user_data: self.user_data.as_deref(),
            };
            match rulevm::run(program, &mut api) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(error) => {
                    tracing::warn!(%error, pattern = %pattern.name, "condition program failed");
                    return false;
                }
            }
        }

        true
    }
}

/// Condition VM bindings for one cell of one candidate
struct GridVmApi<'a> {
    coord: IVec2,
    kind: CellKind,
    grid: &'a MarkerGrid,
    heights: &'a HeightGrid,
    level_transform: Mat4,
    grid_size: Vec3,
    script_cache: &'a mut ScriptInstanceCache,
    user_data: Option<&'a dyn Any>,
}

impl GridVmApi<'_> {
    fn world_position(&self) -> Vec3 {
        let height = self
            .heights
            .get(self.coord)
            .map_or(0, |h| h.height(self.kind));
        let coord_f = Vec3::new(self.coord.x as f32, height as f32, self.coord.y as f32);
        self.level_transform.transform_point3(coord_f * self.grid_size)
    }
}

impl VmApi for GridVmApi<'_> {
    fn marker_exists(&mut self, marker_name: &str) -> bool {
        self.grid
            .cell(self.coord)
            .is_some_and(|cell| cell.contains(marker_name, self.kind))
    }

    fn condition_script(&mut self, script_class: &str) -> bool {
        let context = ScriptContext {
            position: self.world_position(),
            coord: self.coord,
            kind: self.kind,
            level_transform: self.level_transform,
            user_data: self.user_data,
        };
        match self.script_cache.get(script_class) {
            Some(script) => script.validate(&context),
            None => false,
        }
    }
}

/// Emit every placement of `assembly` covering the window, inflated by the
/// stamp's own footprint so placements may overhang the window edge.
fn push_candidates(
    assembly: &PatternAssembly,
    index: usize,
    grid: &MarkerGrid,
    candidates: &mut Vec<Candidate>,
) {
    if assembly.rules.is_empty() {
        return;
    }

    let start = grid.world_offset() - assembly.size();
    let end = grid.world_offset() + grid.world_size();
    for y in start.y..=end.y {
        for x in start.x..=end.x {
            candidates.push(Candidate {
                base: IVec2::new(x, y),
                assembly: index,
            });
        }
    }
}

fn mark_occupancy(base: IVec2, assembly: &PatternAssembly, occupancy: &mut OccupancyGrid) {
    for rule in &assembly.rules {
        if !rule.insert_hint {
            continue;
        }
        if let Some(cell) = occupancy.get_mut(base + rule.coord) {
            cell.set_occupied(rule.kind, true);
        }
    }
}

fn execute_pattern(
    base: IVec2,
    assembly: &PatternAssembly,
    pattern: &Pattern,
    grid: &mut MarkerGrid,
    heights: &HeightGrid,
) {
    for rule in &assembly.rules {
        let actions = &pattern.rules[rule.rule_index].actions;
        let coord = base + rule.coord;
        for action in &actions.actions {
            match action {
                ActionInfo::AddMarker {
                    marker_name,
                    copy_rotation_from,
                    copy_height_from,
                } => {
                    add_marker(
                        grid,
                        heights,
                        coord,
                        rule.kind,
                        assembly,
                        marker_name,
                        copy_rotation_from,
                        copy_height_from,
                    );
                }
                ActionInfo::RemoveMarker { marker_name } => {
                    if let Some(cell) = grid.cell_mut(coord) {
                        cell.remove(marker_name, rule.kind);
                    }
                }
            }
        }
    }
}

/// Insert a marker at a cell slot. No-op when a marker with the same tag is
/// already there.
#[allow(clippy::too_many_arguments)]
fn add_marker(
    grid: &mut MarkerGrid,
    heights: &HeightGrid,
    coord: IVec2,
    kind: CellKind,
    assembly: &PatternAssembly,
    marker_name: &str,
    copy_rotation_from: &[String],
    copy_height_from: &[String],
) {
    let (rotation_override, height_override) = {
        let Some(cell) = grid.cell(coord) else {
            return;
        };
        if cell.contains(marker_name, kind) {
            return;
        }

        let rotation_override = cell
            .markers(kind)
            .iter()
            .find(|m| copy_rotation_from.contains(&m.tag))
            .map(Marker::rotation);
        let height_override = cell
            .markers(kind)
            .iter()
            .find(|m| copy_height_from.contains(&m.tag))
            .map(|m| m.position().y);
        (rotation_override, height_override)
    };

    let coord_y = heights.get(coord).map_or(0, |h| h.height(kind));
    let rotation = rotation_override
        .unwrap_or_else(|| world_rotation(assembly.rotation_angle_deg, assembly.rotation_index, kind));

    let mut location = grid.cell_to_world(coord, coord_y, kind);
    if let Some(y) = height_override {
        location.y = y;
    }

    let id = grid.next_marker_id();
    if let Some(cell) = grid.cell_mut(coord) {
        cell.add(
            Marker::new(id, marker_name, Mat4::from_rotation_translation(rotation, location)),
            kind,
        );
    }
}

/// World-space orientation of an inserted marker.
///
/// Edges are authored axis-aligned at rotation 0; after the stamp rotates,
/// an EdgeZ slot at index 0/2 and an EdgeX slot at index 1/3 need an extra
/// quarter or three-quarter turn to face along their edge.
fn world_rotation(angle_deg: f32, rotation_index: u32, kind: CellKind) -> Quat {
    let mut angle = angle_deg;
    match (rotation_index, kind) {
        (0, CellKind::EdgeZ) | (1, CellKind::EdgeX) => angle += 90.0,
        (2, CellKind::EdgeZ) | (3, CellKind::EdgeX) => angle += 270.0,
        _ => {}
    }
    Quat::from_rotation_y(angle.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_rotation_edge_corrections() {
        let quarter = Quat::from_rotation_y(90f32.to_radians());
        assert!(world_rotation(0.0, 0, CellKind::EdgeZ).abs_diff_eq(quarter, 1e-5));
        assert!(world_rotation(0.0, 0, CellKind::EdgeX).abs_diff_eq(Quat::IDENTITY, 1e-5));
        assert!(world_rotation(0.0, 0, CellKind::Ground).abs_diff_eq(Quat::IDENTITY, 1e-5));

        // At index 1 the stamp itself already turned 90; EdgeX gets the
        // extra correction on top of the base angle
        let expected = Quat::from_rotation_y(180f32.to_radians());
        assert!(world_rotation(90.0, 1, CellKind::EdgeX).abs_diff_eq(expected, 1e-5));
    }
}
