//! Property tests for the local/global round trip through the transform cache.

use glam::{EulerRot, Quat, Vec3};
use proptest::prelude::*;

use crate::{
    ControlSettings, ControlValue, ElementWeight, RigHierarchy, Space, Transform, TransformKind,
};

fn arb_translation() -> impl Strategy<Value = Vec3> {
    prop::array::uniform3(-10.0..10.0f32).prop_map(Vec3::from_array)
}

fn arb_rotation() -> impl Strategy<Value = Quat> {
    prop::array::uniform3(-std::f32::consts::PI..std::f32::consts::PI)
        .prop_map(|[z, y, x]| Quat::from_euler(EulerRot::ZYX, z, y, x))
}

/// Parent spaces keep a uniform scale so that composition stays a pure TRS.
fn arb_parent() -> impl Strategy<Value = Transform> {
    (arb_translation(), arb_rotation(), 0.5..2.0f32)
        .prop_map(|(t, r, s)| Transform::new(t, r, Vec3::splat(s)))
}

fn arb_local() -> impl Strategy<Value = Transform> {
    (
        arb_translation(),
        arb_rotation(),
        prop::array::uniform3(0.5..2.0f32),
    )
        .prop_map(|(t, r, s)| Transform::new(t, r, Vec3::from_array(s)))
}

fn arb_weight() -> impl Strategy<Value = ElementWeight> {
    prop::array::uniform3(0.1..1.0f32).prop_map(|[l, r, s]| ElementWeight::new(l, r, s))
}

/// Every channel driven by exactly one of two parents.
fn arb_channel_split() -> impl Strategy<Value = (ElementWeight, ElementWeight)> {
    prop::array::uniform3(any::<bool>()).prop_map(|picks| {
        let [l, r, s] = picks.map(|from_first| if from_first { 1.0 } else { 0.0 });
        (
            ElementWeight::new(l, r, s),
            ElementWeight::new(1.0 - l, 1.0 - r, 1.0 - s),
        )
    })
}

fn rig(parent: Transform) -> (RigHierarchy, usize) {
    let mut hierarchy = RigHierarchy::new();
    let root = hierarchy
        .add_bone("root", None, parent, Space::Local)
        .unwrap();
    let child = hierarchy
        .add_bone("child", Some(root), Transform::IDENTITY, Space::Local)
        .unwrap();
    (hierarchy, child)
}

fn two_parent_null(
    parents: [Transform; 2],
    weights: [ElementWeight; 2],
) -> (RigHierarchy, usize) {
    let mut hierarchy = RigHierarchy::new();
    let a = hierarchy
        .add_bone("a", None, parents[0], Space::Local)
        .unwrap();
    let b = hierarchy
        .add_bone("b", None, parents[1], Space::Local)
        .unwrap();
    let null = hierarchy
        .add_null("space", None, Transform::IDENTITY, Space::Local)
        .unwrap();
    hierarchy.add_parent(null, a, weights[0], false).unwrap();
    hierarchy.add_parent(null, b, weights[1], false).unwrap();
    (hierarchy, null)
}

fn two_parent_control(
    parents: [Transform; 2],
    weights: (ElementWeight, ElementWeight),
    offset: Transform,
) -> (RigHierarchy, usize) {
    let mut hierarchy = RigHierarchy::new();
    let a = hierarchy
        .add_bone("a", None, parents[0], Space::Local)
        .unwrap();
    let b = hierarchy
        .add_bone("b", None, parents[1], Space::Local)
        .unwrap();
    let control = hierarchy
        .add_control(
            "ctrl",
            None,
            ControlSettings::default(),
            ControlValue::Transform(Transform::IDENTITY),
            offset,
            Transform::IDENTITY,
        )
        .unwrap();
    hierarchy.add_parent(control, a, weights.0, false).unwrap();
    hierarchy.add_parent(control, b, weights.1, false).unwrap();
    (hierarchy, control)
}

proptest! {
    #[test]
    fn local_to_global_and_back(
        parent in arb_parent(),
        local in arb_local(),
        initial in any::<bool>(),
    ) {
        let (mut hierarchy, child) = rig(parent);
        let local_kind = TransformKind::local(initial);
        let global_kind = TransformKind::global(initial);

        hierarchy.set_transform(child, local, local_kind, true, false, false);
        let global = hierarchy.get_transform(child, global_kind);
        prop_assert!(global.equals(&(local * parent), 1e-3));

        let (mut other, other_child) = rig(parent);
        other.set_transform(other_child, global, global_kind, true, false, false);
        let recovered = other.get_transform(other_child, local_kind);
        prop_assert!(
            recovered.equals(&local, 1e-3),
            "expected {:?}, got {:?}",
            local,
            recovered
        );
    }

    #[test]
    fn relative_to_inverts_composition(parent in arb_parent(), local in arb_local()) {
        let global = local * parent;
        prop_assert!(global.relative_to(&parent).equals(&local, 1e-3));
        prop_assert!((parent * parent.inverse()).equals(&Transform::IDENTITY, 1e-3));
    }

    #[test]
    fn multi_parent_null_local_to_global_and_back(
        parents in prop::array::uniform2(arb_parent()),
        weights in prop::array::uniform2(arb_weight()),
        local in arb_local(),
        initial in any::<bool>(),
    ) {
        let local_kind = TransformKind::local(initial);
        let global_kind = TransformKind::global(initial);

        let (mut hierarchy, null) = two_parent_null(parents, weights);
        hierarchy.set_transform(null, local, local_kind, true, false, false);
        let global = hierarchy.get_transform(null, global_kind);

        let (mut other, other_null) = two_parent_null(parents, weights);
        other.set_transform(other_null, global, global_kind, true, false, false);
        let recovered = other.get_transform(other_null, local_kind);
        prop_assert!(
            recovered.equals(&local, 1e-3),
            "expected {:?}, got {:?}",
            local,
            recovered
        );
    }

    #[test]
    fn split_channel_control_local_to_global_and_back(
        parents in prop::array::uniform2(arb_parent()),
        weights in arb_channel_split(),
        offset in arb_parent(),
        local in arb_local(),
    ) {
        let (mut hierarchy, control) = two_parent_control(parents, weights, offset);
        hierarchy.set_transform(control, local, TransformKind::CurrentLocal, true, false, false);
        let global = hierarchy.get_transform(control, TransformKind::CurrentGlobal);

        let (mut other, other_control) = two_parent_control(parents, weights, offset);
        other.set_transform(other_control, global, TransformKind::CurrentGlobal, true, false, false);
        let recovered = other.get_transform(other_control, TransformKind::CurrentLocal);
        prop_assert!(
            recovered.equals(&local, 1e-3),
            "expected {:?}, got {:?}",
            local,
            recovered
        );
    }
}
