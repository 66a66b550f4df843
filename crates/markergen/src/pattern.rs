//! Pattern and rule definitions
//!
//! A pattern is a small stamp of rules, each anchored to a cell offset and
//! slot kind. Rules pair a compiled condition program with a compiled
//! action list; a pattern matches at a base coordinate when every rule's
//! condition holds at its offset cell.

use glam::IVec2;
use gridscene::CellKind;
use rulevm::{ActionInfo, ActionList, RuleProgram};
use serde::{Deserialize, Serialize};

/// One rule of a pattern: a condition at a cell offset, plus the actions
/// to run there when the whole pattern matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    /// Cell offset relative to the pattern's base coordinate
    pub coord: IVec2,

    /// Which slot of the cell this rule inspects
    pub kind: CellKind,

    /// Hint that this rule's actions will place an asset here (drives
    /// overlap rejection)
    pub insert_asset_hint: bool,

    /// Compiled condition program
    pub program: RuleProgram,

    /// Compiled action list
    pub actions: ActionList,
}

impl PatternRule {
    /// Create a rule at the given offset and slot kind
    pub fn new(coord: IVec2, kind: CellKind) -> Self {
        PatternRule {
            coord,
            kind,
            insert_asset_hint: false,
            program: RuleProgram::default(),
            actions: ActionList::new(),
        }
    }

    /// Set the compiled condition program
    pub fn with_program(mut self, program: RuleProgram) -> Self {
        self.program = program;
        self
    }

    /// Set the compiled action list
    pub fn with_actions(mut self, actions: ActionList) -> Self {
        self.actions = actions;
        self
    }

    /// Mark this rule as one that places an asset when it fires
    pub fn with_insert_hint(mut self, hint: bool) -> Self {
        self.insert_asset_hint = hint;
        self
    }

    /// True if applying this rule would place an asset at its cell: either
    /// the authored hint is set, or the compiled actions emit a marker.
    pub fn inserts_asset_here(&self) -> bool {
        self.insert_asset_hint || self.actions.emits_marker
    }
}

/// A named stamp of rules with its matching policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern name, for logs
    pub name: String,

    /// The rules making up the stamp
    pub rules: Vec<PatternRule>,

    /// Chance in [0, 1] that a matched placement is actually applied
    pub probability: f32,

    /// Try all four 90-degree rotations of the stamp
    pub rotate_to_fit: bool,

    /// Shuffle the candidate placements before matching
    pub randomize_fitting_order: bool,

    /// Allow two placements to insert assets into the same cell slot
    pub allow_insertion_overlaps: bool,

    /// Marker tags that must sit at one elevation across the whole match
    pub same_height_tags: Vec<String>,

    /// Extra cells of matching window on all four sides, so patterns can
    /// fire just outside the authored marker extent
    pub domain_expansion: i32,
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern {
            name: String::new(),
            rules: Vec::new(),
            probability: 1.0,
            rotate_to_fit: true,
            randomize_fitting_order: true,
            allow_insertion_overlaps: false,
            same_height_tags: Vec::new(),
            domain_expansion: 0,
        }
    }
}

impl Pattern {
    /// Create an empty pattern
    pub fn new(name: impl Into<String>) -> Self {
        Pattern {
            name: name.into(),
            ..Pattern::default()
        }
    }

    /// Add a rule to the stamp
    pub fn with_rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the application probability
    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }

    /// Enable or disable rotated fitting
    pub fn with_rotate_to_fit(mut self, rotate: bool) -> Self {
        self.rotate_to_fit = rotate;
        self
    }

    /// Enable or disable candidate shuffling
    pub fn with_randomize_fitting_order(mut self, randomize: bool) -> Self {
        self.randomize_fitting_order = randomize;
        self
    }

    /// Allow placements to insert into already-occupied slots
    pub fn with_allow_insertion_overlaps(mut self, allow: bool) -> Self {
        self.allow_insertion_overlaps = allow;
        self
    }

    /// Require these marker tags to sit at one elevation across a match
    pub fn with_same_height_tags(mut self, tags: Vec<String>) -> Self {
        self.same_height_tags = tags;
        self
    }

    /// Widen the matching window by this many cells on all sides
    pub fn with_domain_expansion(mut self, expansion: i32) -> Self {
        self.domain_expansion = expansion;
        self
    }

    /// True if some rule carries both a compiled condition and a non-empty
    /// action list. Patterns failing this check are skipped entirely by the
    /// processor.
    pub fn has_executable_rule(&self) -> bool {
        self.rules
            .iter()
            .any(|r| r.program.compiled && !r.actions.is_empty())
    }
}

/// A generator asset: the ordered list of patterns to run over a scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorAsset {
    pub patterns: Vec<Pattern>,
}

impl GeneratorAsset {
    /// Create an empty asset
    pub fn new() -> Self {
        GeneratorAsset::default()
    }

    /// Add a pattern
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

/// Build the always-true condition program used by rules that match
/// unconditionally alongside a marker-exists check elsewhere in the stamp.
pub fn always_true_program() -> RuleProgram {
    use rulevm::{compile_condition, NodeKind, RuleGraph};

    let mut graph = RuleGraph::new();
    graph.add_node(NodeKind::Result);
    let mut program = RuleProgram::default();
    compile_condition(&graph, &mut program);
    program
}

/// Build the single-check "marker with this tag exists here" program.
pub fn marker_exists_program(marker_name: &str) -> RuleProgram {
    use rulevm::{compile_condition, NodeKind, RuleGraph};

    let mut graph = RuleGraph::new();
    let result = graph.add_node(NodeKind::Result);
    let exists = graph.add_node(NodeKind::MarkerExists {
        marker_name: marker_name.to_string(),
    });
    graph.connect(exists, result, 0);
    let mut program = RuleProgram::default();
    compile_condition(&graph, &mut program);
    program
}

/// Build the action list for a bare add-marker action.
pub fn add_marker_actions(marker_name: &str) -> ActionList {
    ActionList {
        actions: vec![ActionInfo::AddMarker {
            marker_name: marker_name.to_string(),
            copy_rotation_from: Vec::new(),
            copy_height_from: Vec::new(),
        }],
        emits_marker: true,
    }
}

/// Build the action list for a bare remove-marker action.
pub fn remove_marker_actions(marker_name: &str) -> ActionList {
    ActionList {
        actions: vec![ActionInfo::RemoveMarker {
            marker_name: marker_name.to_string(),
        }],
        emits_marker: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_defaults() {
        let pattern = Pattern::new("torches");
        assert_eq!(pattern.probability, 1.0);
        assert!(pattern.rotate_to_fit);
        assert!(pattern.randomize_fitting_order);
        assert!(!pattern.allow_insertion_overlaps);
        assert!(pattern.same_height_tags.is_empty());
        assert_eq!(pattern.domain_expansion, 0);
    }

    #[test]
    fn test_has_executable_rule_needs_both_halves() {
        let empty = Pattern::new("empty");
        assert!(!empty.has_executable_rule());

        // Compiled condition but no actions anywhere
        let condition_only = Pattern::new("cond").with_rule(
            PatternRule::new(IVec2::ZERO, CellKind::Ground)
                .with_program(marker_exists_program("Ground")),
        );
        assert!(!condition_only.has_executable_rule());

        // Actions but no compiled condition
        let actions_only = Pattern::new("act").with_rule(
            PatternRule::new(IVec2::ZERO, CellKind::Ground)
                .with_actions(add_marker_actions("Prop")),
        );
        assert!(!actions_only.has_executable_rule());

        // Split across two rules is not enough, the same rule needs both
        let split = Pattern::new("split")
            .with_rule(
                PatternRule::new(IVec2::ZERO, CellKind::Ground)
                    .with_program(marker_exists_program("Ground")),
            )
            .with_rule(
                PatternRule::new(IVec2::new(1, 0), CellKind::Ground)
                    .with_actions(add_marker_actions("Prop")),
            );
        assert!(!split.has_executable_rule());

        let both = Pattern::new("both").with_rule(
            PatternRule::new(IVec2::ZERO, CellKind::Ground)
                .with_program(marker_exists_program("Ground"))
                .with_actions(add_marker_actions("Prop")),
        );
        assert!(both.has_executable_rule());
    }

    #[test]
    fn test_inserts_asset_here() {
        let rule = PatternRule::new(IVec2::ZERO, CellKind::Ground);
        assert!(!rule.inserts_asset_here());

        let hinted = rule.clone().with_insert_hint(true);
        assert!(hinted.inserts_asset_here());

        let adding = rule.with_actions(add_marker_actions("Prop"));
        assert!(adding.inserts_asset_here());

        let removing =
            PatternRule::new(IVec2::ZERO, CellKind::Ground).with_actions(remove_marker_actions("Prop"));
        assert!(!removing.inserts_asset_here());
    }

    #[test]
    fn test_helper_programs_compile() {
        assert!(always_true_program().compiled);
        assert!(marker_exists_program("Wall").compiled);
    }

    #[test]
    fn test_pattern_serialization_roundtrip() {
        let pattern = Pattern::new("walls")
            .with_probability(0.5)
            .with_rule(
                PatternRule::new(IVec2::new(0, 1), CellKind::EdgeX)
                    .with_program(marker_exists_program("Wall"))
                    .with_actions(add_marker_actions("Torch")),
            );

        let json = serde_json::to_string(&pattern).unwrap();
        let restored: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "walls");
        assert_eq!(restored.rules.len(), 1);
        assert_eq!(restored.rules[0].kind, CellKind::EdgeX);
        assert!(restored.rules[0].program.compiled);
    }
}
