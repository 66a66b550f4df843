//! Markergen crate - grid pattern matching over scene markers
//!
//! Patterns pair condition programs (compiled by `rulevm`) with marker
//! actions, anchored to cells of the scene grid (`gridscene`). The
//! processor stamps each pattern across the grid in all requested
//! orientations, filters placements through occupancy, height and condition
//! checks, and applies the survivors' actions to produce a new marker
//! array.

mod assembly;
mod pattern;
mod processor;
mod rng;
mod script;
mod source;

pub use assembly::{build_assemblies, PatternAssembly, RuleInstance};
pub use pattern::{
    add_marker_actions, always_true_program, marker_exists_program, remove_marker_actions,
    GeneratorAsset, Pattern, PatternRule,
};
pub use processor::MarkerGenProcessor;
pub use rng::{shuffle, RandomStream, StdRandom};
pub use script::{RuleScript, ScriptContext, ScriptFactory, ScriptInstanceCache};
pub use source::{MarkerSource, VecMarkerSource};
