//! End-to-end processor tests

use glam::{IVec2, Mat4, Quat, Vec3};
use markergen::{
    add_marker_actions, marker_exists_program, GeneratorAsset, MarkerGenProcessor, Pattern,
    PatternRule, RandomStream, StdRandom, VecMarkerSource,
};
use gridscene::{CellKind, Marker};

const CELL: Vec3 = Vec3::new(4.0, 0.0, 4.0);

fn ground_marker(id: i32, x: i32, z: i32, y: f32) -> Marker {
    Marker::new(
        id,
        "Ground",
        Mat4::from_translation(Vec3::new(
            (x as f32 + 0.5) * CELL.x,
            y,
            (z as f32 + 0.5) * CELL.z,
        )),
    )
}

fn ground_grid(size: i32) -> Vec<Marker> {
    let mut markers = Vec::new();
    for z in 0..size {
        for x in 0..size {
            markers.push(ground_marker(markers.len() as i32, x, z, 0.0));
        }
    }
    markers
}

/// The single-rule "add a Prop on every Ground tile" pattern
fn prop_on_ground_pattern() -> Pattern {
    Pattern::new("props")
        .with_rotate_to_fit(false)
        .with_randomize_fitting_order(false)
        .with_rule(
            PatternRule::new(IVec2::ZERO, CellKind::Ground)
                .with_program(marker_exists_program("Ground"))
                .with_actions(add_marker_actions("Prop")),
        )
}

fn count_tag(markers: &[Marker], tag: &str) -> usize {
    markers.iter().filter(|m| m.tag == tag).count()
}

#[test]
fn test_prop_added_on_every_ground_tile() {
    let markers = ground_grid(5);
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = StdRandom::seeded(1);

    let output = processor
        .process(&prop_on_ground_pattern(), &markers, &mut rng)
        .unwrap();

    assert_eq!(output.len(), 50);
    assert_eq!(count_tag(&output, "Ground"), 25);
    assert_eq!(count_tag(&output, "Prop"), 25);

    // Ids are reassigned sequentially
    let ids: Vec<_> = output.iter().map(|m| m.id).collect();
    assert_eq!(ids, (0..50).collect::<Vec<_>>());

    // Every Prop sits at its tile's ground position, at height 0
    let ground_positions: Vec<Vec3> = markers.iter().map(Marker::position).collect();
    for prop in output.iter().filter(|m| m.tag == "Prop") {
        let position = prop.position();
        assert_eq!(position.y, 0.0);
        assert!(
            ground_positions
                .iter()
                .any(|g| g.abs_diff_eq(position, 1e-4)),
            "prop at unexpected position {position:?}"
        );
    }
}

#[test]
fn test_second_pass_is_idempotent() {
    let markers = ground_grid(5);
    let pattern = prop_on_ground_pattern();
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);

    let mut rng = StdRandom::seeded(7);
    let first = processor.process(&pattern, &markers, &mut rng).unwrap();

    let mut rng = StdRandom::seeded(7);
    let second = processor.process(&pattern, &first, &mut rng).unwrap();

    // Add-marker is a no-op where the tag already exists, so the second
    // pass changes nothing
    assert_eq!(first, second);
    assert_eq!(count_tag(&second, "Prop"), 25);
}

#[test]
fn test_shuffled_fitting_order_yields_same_canonical_output() {
    let markers = ground_grid(5);
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);

    let mut rng = StdRandom::seeded(1);
    let ordered = processor
        .process(&prop_on_ground_pattern(), &markers, &mut rng)
        .unwrap();

    // With non-overlapping single-cell placements the match set does not
    // depend on candidate order, and flatten is canonical row-major
    let shuffled_pattern = prop_on_ground_pattern().with_randomize_fitting_order(true);
    let mut rng = StdRandom::seeded(99);
    let shuffled = processor
        .process(&shuffled_pattern, &markers, &mut rng)
        .unwrap();

    assert_eq!(ordered, shuffled);
}

#[test]
fn test_skipped_pattern_returns_none() {
    let markers = ground_grid(2);
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = StdRandom::seeded(1);

    // No rules at all
    assert!(processor
        .process(&Pattern::new("empty"), &markers, &mut rng)
        .is_none());

    // Condition but no actions on the same rule
    let inert = Pattern::new("inert").with_rule(
        PatternRule::new(IVec2::ZERO, CellKind::Ground)
            .with_program(marker_exists_program("Ground")),
    );
    assert!(processor.process(&inert, &markers, &mut rng).is_none());
}

#[test]
fn test_zero_probability_matches_but_never_applies() {
    let markers = ground_grid(3);
    let pattern = prop_on_ground_pattern().with_probability(0.0);
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = StdRandom::seeded(1);

    let output = processor.process(&pattern, &markers, &mut rng).unwrap();
    assert_eq!(count_tag(&output, "Prop"), 0);
    assert_eq!(count_tag(&output, "Ground"), 9);
}

#[test]
fn test_same_height_constraint_rejects_mixed_elevation() {
    let tall_cell = Vec3::new(4.0, 2.0, 4.0);
    let markers = vec![
        ground_marker(0, 0, 0, 0.0),
        ground_marker(1, 1, 0, 4.0), // two steps up
    ];

    let pair_pattern = |tags: Vec<String>| {
        Pattern::new("pair")
            .with_rotate_to_fit(false)
            .with_randomize_fitting_order(false)
            .with_same_height_tags(tags)
            .with_rule(
                PatternRule::new(IVec2::ZERO, CellKind::Ground)
                    .with_program(marker_exists_program("Ground"))
                    .with_actions(add_marker_actions("Bridge")),
            )
            .with_rule(
                PatternRule::new(IVec2::new(1, 0), CellKind::Ground)
                    .with_program(marker_exists_program("Ground")),
            )
    };

    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, tall_cell);

    // Without the constraint, the pair matches across the step
    let mut rng = StdRandom::seeded(1);
    let unconstrained = processor
        .process(&pair_pattern(Vec::new()), &markers, &mut rng)
        .unwrap();
    assert_eq!(count_tag(&unconstrained, "Bridge"), 1);

    // With it, the elevation mismatch rejects every placement
    let mut rng = StdRandom::seeded(1);
    let constrained = processor
        .process(&pair_pattern(vec!["Ground".to_string()]), &markers, &mut rng)
        .unwrap();
    assert_eq!(count_tag(&constrained, "Bridge"), 0);
}

#[test]
fn test_rotated_assembly_matches_vertical_pair() {
    // "A" and "B" stacked along Z; the pattern is authored horizontally
    // and can only fit through rotation
    let markers = vec![
        Marker::new(0, "A", Mat4::from_translation(Vec3::new(2.0, 0.0, 2.0))),
        Marker::new(1, "B", Mat4::from_translation(Vec3::new(2.0, 0.0, 6.0))),
    ];

    let pattern = Pattern::new("pair")
        .with_randomize_fitting_order(false)
        .with_rule(
            PatternRule::new(IVec2::ZERO, CellKind::Ground)
                .with_program(marker_exists_program("A"))
                .with_actions(add_marker_actions("Hit")),
        )
        .with_rule(
            PatternRule::new(IVec2::new(1, 0), CellKind::Ground)
                .with_program(marker_exists_program("B")),
        );

    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = StdRandom::seeded(1);
    let output = processor.process(&pattern, &markers, &mut rng).unwrap();

    assert_eq!(count_tag(&output, "Hit"), 1);
    let hit = output.iter().find(|m| m.tag == "Hit").unwrap();
    assert!(hit.position().abs_diff_eq(Vec3::new(2.0, 0.0, 2.0), 1e-4));

    // Without rotation the horizontal stamp never fits
    let fixed = pattern.with_rotate_to_fit(false);
    let mut rng = StdRandom::seeded(1);
    let output = processor.process(&fixed, &markers, &mut rng).unwrap();
    assert_eq!(count_tag(&output, "Hit"), 0);
}

#[test]
fn test_level_transform_roundtrip() {
    let transform = Mat4::from_rotation_translation(
        Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        Vec3::new(100.0, 5.0, -40.0),
    );

    // Author markers in local space, then push them out to world space
    let local = ground_grid(2);
    let world: Vec<Marker> = local
        .iter()
        .map(|m| Marker::new(m.id, m.tag.clone(), transform * m.transform))
        .collect();

    let mut processor = MarkerGenProcessor::new(transform, CELL);
    let mut rng = StdRandom::seeded(1);
    let output = processor
        .process(&prop_on_ground_pattern(), &world, &mut rng)
        .unwrap();

    assert_eq!(count_tag(&output, "Prop"), 4);
    // Props come back in world space, at their tile's ground position
    let ground_positions: Vec<Vec3> = world.iter().map(Marker::position).collect();
    for prop in output.iter().filter(|m| m.tag == "Prop") {
        assert!(
            ground_positions
                .iter()
                .any(|g| g.abs_diff_eq(prop.position(), 1e-3)),
            "prop at unexpected position {:?}",
            prop.position()
        );
    }
}

#[test]
fn test_process_all_pipelines_patterns() {
    // The second pattern keys off markers the first one inserts
    let asset = GeneratorAsset::new()
        .with_pattern(prop_on_ground_pattern())
        .with_pattern(
            Pattern::new("lamps")
                .with_rotate_to_fit(false)
                .with_randomize_fitting_order(false)
                .with_rule(
                    PatternRule::new(IVec2::ZERO, CellKind::Ground)
                        .with_program(marker_exists_program("Prop"))
                        .with_actions(add_marker_actions("Lamp")),
                ),
        );

    let mut source = VecMarkerSource::new(ground_grid(3));
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = StdRandom::seeded(5);

    processor.process_all(&asset, &mut source, &mut rng);

    let markers = source.markers();
    assert_eq!(count_tag(markers, "Ground"), 9);
    assert_eq!(count_tag(markers, "Prop"), 9);
    assert_eq!(count_tag(markers, "Lamp"), 9);
}

#[test]
fn test_probability_roll_uses_supplied_stream() {
    // A stream whose floats alternate 0.0 / 1.0: with probability 0.5 the
    // roll `f <= p` accepts exactly every other matched placement
    struct Alternating {
        flip: bool,
    }
    impl RandomStream for Alternating {
        fn next_float(&mut self) -> f32 {
            self.flip = !self.flip;
            if self.flip {
                0.0
            } else {
                1.0
            }
        }
        fn next_int(&mut self, _bound: usize) -> usize {
            0
        }
    }

    let markers = ground_grid(4);
    let pattern = prop_on_ground_pattern().with_probability(0.5);
    let mut processor = MarkerGenProcessor::new(Mat4::IDENTITY, CELL);
    let mut rng = Alternating { flip: false };

    let output = processor.process(&pattern, &markers, &mut rng).unwrap();
    assert_eq!(count_tag(&output, "Prop"), 8);
}
