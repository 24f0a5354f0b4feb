use glam::{Quat, Vec3};

use super::element::ParentConstraint;
use super::solver::{
    ParentResolver, compute_parent_constraint_indices, inverse_solve_parent_constraints,
    solve_parent_constraints, weight_for_lerp,
};
use super::test_support::{assert_transform_approx, assert_vec3_approx, rotated_z, translation};
use crate::{ElementWeight, Transform, TransformKind};

/// Parent globals held in a plain list, counting lookups.
struct FixedParents {
    globals: Vec<Transform>,
    lookups: usize,
}

impl FixedParents {
    fn new(globals: Vec<Transform>) -> Self {
        Self { globals, lookups: 0 }
    }
}

impl ParentResolver for FixedParents {
    fn parent_global(&mut self, parent: usize, _kind: TransformKind) -> Transform {
        self.lookups += 1;
        self.globals[parent]
    }
}

fn constraints(weights: &[ElementWeight]) -> Vec<ParentConstraint> {
    weights
        .iter()
        .enumerate()
        .map(|(parent, &weight)| ParentConstraint::new(parent, weight))
        .collect()
}

const CURRENT: TransformKind = TransformKind::CurrentGlobal;

#[test]
fn single_parent_is_copied_with_offset_and_pose_applied_first() {
    let parent = Transform::new(Vec3::new(2.0, 0.0, 0.0), rotated_z(90.0), Vec3::splat(2.0));
    let offset = translation(0.0, 1.0, 0.0);
    let pose = translation(1.0, 0.0, 0.0);
    let mut resolver = FixedParents::new(vec![parent]);
    let mut list = constraints(&[ElementWeight::ONE]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, Some(offset), Some(pose));
    assert_transform_approx(result, pose * offset * parent);
}

#[test]
fn two_parent_blend_approaches_each_end() {
    let a = translation(0.0, 0.0, 0.0);
    let b = Transform::new(Vec3::new(10.0, 0.0, 0.0), rotated_z(90.0), Vec3::splat(3.0));

    let mut resolver = FixedParents::new(vec![a, b]);
    let mut list = constraints(&[ElementWeight::ONE, ElementWeight::splat(1e-6)]);
    let near_a = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_transform_approx(near_a, a);

    let mut list = constraints(&[ElementWeight::splat(1e-6), ElementWeight::ONE]);
    let near_b = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_transform_approx(near_b, b);
}

#[test]
fn two_parent_blend_interpolates_every_channel() {
    let a = Transform::IDENTITY;
    let b = Transform::new(Vec3::new(10.0, 0.0, 0.0), rotated_z(90.0), Vec3::splat(3.0));
    let mut resolver = FixedParents::new(vec![a, b]);
    let mut list = constraints(&[ElementWeight::splat(0.5), ElementWeight::splat(0.5)]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_vec3_approx(result.translation, Vec3::new(5.0, 0.0, 0.0));
    assert_vec3_approx(result.scale, Vec3::splat(2.0));
    assert!(result.rotation.abs_diff_eq(rotated_z(45.0), 1e-4));
}

#[test]
fn n_way_location_is_the_weighted_mean() {
    let parents = vec![
        translation(0.0, 0.0, 0.0),
        translation(10.0, 0.0, 0.0),
        translation(0.0, 10.0, 0.0),
        translation(0.0, 0.0, 10.0),
    ];
    let mut resolver = FixedParents::new(parents);
    let mut list = constraints(&[
        ElementWeight::splat(0.1),
        ElementWeight::splat(0.2),
        ElementWeight::splat(0.3),
        ElementWeight::splat(0.4),
    ]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_vec3_approx(result.translation, Vec3::new(2.0, 3.0, 4.0));
}

#[test]
fn n_way_identical_rotations_survive_any_weighting() {
    let rotation = Quat::from_rotation_y(0.8) * rotated_z(30.0);
    let parents = vec![
        Transform::from_rotation(rotation),
        Transform::from_rotation(-rotation),
        Transform::from_rotation(rotation),
    ];
    let mut resolver = FixedParents::new(parents);
    let mut list = constraints(&[
        ElementWeight::splat(0.6),
        ElementWeight::splat(0.3),
        ElementWeight::splat(0.1),
    ]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_transform_approx(result, Transform::from_rotation(rotation));
}

#[test]
fn channels_blend_independently() {
    let a = Transform::new(Vec3::new(1.0, 0.0, 0.0), rotated_z(90.0), Vec3::splat(2.0));
    let b = Transform::new(Vec3::new(0.0, 7.0, 0.0), Quat::IDENTITY, Vec3::splat(5.0));
    let mut resolver = FixedParents::new(vec![a, b]);
    let mut list = constraints(&[
        ElementWeight::new(0.0, 1.0, 0.0),
        ElementWeight::new(1.0, 0.0, 0.0),
    ]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_vec3_approx(result.translation, b.translation);
    assert!(result.rotation.abs_diff_eq(a.rotation, 1e-5));
    // no parent drives scale
    assert_vec3_approx(result.scale, Vec3::ONE);
}

#[test]
fn no_active_parent_falls_back_to_pose_times_offset() {
    let offset = translation(0.0, 2.0, 0.0);
    let pose = Transform::from_rotation(rotated_z(90.0));
    let mut resolver = FixedParents::new(vec![translation(100.0, 0.0, 0.0)]);
    let mut list = constraints(&[ElementWeight::ZERO]);

    let result = solve_parent_constraints(&mut resolver, &mut list, CURRENT, Some(offset), Some(pose));
    assert_transform_approx(result, pose * offset);
    assert_eq!(resolver.lookups, 0);
}

#[test]
fn parents_are_resolved_once_per_solve() {
    let mut resolver = FixedParents::new(vec![translation(1.0, 0.0, 0.0), translation(3.0, 0.0, 0.0)]);
    let mut list = constraints(&[ElementWeight::splat(0.5), ElementWeight::splat(0.5)]);

    solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_eq!(resolver.lookups, 2);

    solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_eq!(resolver.lookups, 4);
}

#[test]
fn initial_and_current_weights_are_separate() {
    let mut resolver = FixedParents::new(vec![translation(0.0, 0.0, 0.0), translation(10.0, 0.0, 0.0)]);
    let mut list = constraints(&[ElementWeight::ONE, ElementWeight::ZERO]);
    list[0].weight = ElementWeight::ZERO;
    list[1].weight = ElementWeight::ONE;

    let initial = solve_parent_constraints(
        &mut resolver,
        &mut list,
        TransformKind::InitialGlobal,
        None,
        None,
    );
    let current = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, None);
    assert_vec3_approx(initial.translation, Vec3::ZERO);
    assert_vec3_approx(current.translation, Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn constraint_indices_count_positive_weights_per_channel() {
    let mut list = constraints(&[
        ElementWeight::new(1.0, 0.0, 0.0),
        ElementWeight::new(1.0, 1.0, 0.0),
        ElementWeight::new(0.5, 0.0, 0.0),
    ]);
    list[1].cache.dirty = false;

    let indices = compute_parent_constraint_indices(&mut list, false);
    let debug = format!("{indices:?}");
    assert!(debug.contains("count: 3"), "{debug}");
    assert!(list.iter().all(|c| c.cache.dirty));
}

#[test]
fn inverse_solve_recovers_the_pose_of_a_single_parent() {
    let parent = Transform::new(
        Vec3::new(4.0, -1.0, 2.0),
        Quat::from_rotation_x(0.5) * rotated_z(20.0),
        Vec3::new(1.5, 2.0, 0.5),
    );
    let offset = Transform::new(Vec3::new(0.0, 1.0, 0.0), rotated_z(-15.0), Vec3::ONE);
    let pose = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.3), Vec3::splat(1.2));
    let mut resolver = FixedParents::new(vec![parent]);
    let mut list = constraints(&[ElementWeight::ONE]);

    let global = solve_parent_constraints(&mut resolver, &mut list, CURRENT, Some(offset), Some(pose));
    let recovered =
        inverse_solve_parent_constraints(&mut resolver, global, &mut list, CURRENT, Some(offset));
    assert_transform_approx(recovered, pose);
}

#[test]
fn inverse_solve_recovers_the_pose_across_a_translation_blend() {
    let mut resolver = FixedParents::new(vec![
        translation(0.0, 0.0, 0.0),
        translation(10.0, 0.0, 0.0),
        translation(0.0, 4.0, 0.0),
    ]);
    let mut list = constraints(&[
        ElementWeight::splat(0.25),
        ElementWeight::splat(0.25),
        ElementWeight::splat(0.5),
    ]);
    let pose = Transform::new(Vec3::new(1.0, 1.0, 0.0), rotated_z(10.0), Vec3::ONE);

    let global = solve_parent_constraints(&mut resolver, &mut list, CURRENT, None, Some(pose));
    assert_vec3_approx(global.translation, Vec3::new(3.5, 3.0, 0.0));
    let recovered = inverse_solve_parent_constraints(&mut resolver, global, &mut list, CURRENT, None);
    assert_transform_approx(recovered, pose);
}

#[test]
fn inverse_solve_uses_each_channels_own_parent() {
    let a = Transform::new(Vec3::new(10.0, 0.0, 0.0), rotated_z(90.0), Vec3::splat(2.0));
    let b = Transform::new(Vec3::new(0.0, -3.0, 0.0), rotated_z(-40.0), Vec3::ONE);
    let offset = Transform::new(Vec3::new(0.0, 0.5, 0.0), rotated_z(15.0), Vec3::ONE);
    let pose = Transform::new(Vec3::new(1.0, 0.0, 2.0), rotated_z(30.0), Vec3::new(1.0, 2.0, 0.5));
    let mut resolver = FixedParents::new(vec![a, b]);
    let mut list = constraints(&[
        ElementWeight::new(1.0, 0.0, 1.0),
        ElementWeight::new(0.0, 1.0, 0.0),
    ]);

    let global = solve_parent_constraints(&mut resolver, &mut list, CURRENT, Some(offset), Some(pose));
    assert_vec3_approx(global.translation, (pose * offset * a).translation);
    assert!(global.rotation.abs_diff_eq((pose * offset * b).rotation, 1e-4));

    let recovered =
        inverse_solve_parent_constraints(&mut resolver, global, &mut list, CURRENT, Some(offset));
    assert_transform_approx(recovered, pose);
}

#[test]
fn lerp_weight_handles_degenerate_sums() {
    assert_eq!(weight_for_lerp(0.0, 0.0), 0.0);
    assert_eq!(weight_for_lerp(-1.0, 2.0), 1.0);
    assert!((weight_for_lerp(1.0, 3.0) - 0.75).abs() < 1e-6);
}
