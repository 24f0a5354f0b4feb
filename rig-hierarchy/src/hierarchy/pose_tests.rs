use super::test_support::{assert_approx, assert_transform_approx, three_bone_chain, translation};
use crate::{
    ControlSettings, ControlValue, ElementKey, ElementType, ElementTypeFilter, Error,
    POSE_FORMAT_VERSION, RigHierarchy, Space, Transform, TransformKind,
};

fn mixed_rig() -> RigHierarchy {
    let (mut hierarchy, a, b, _) = three_bone_chain();
    let null = hierarchy
        .add_null("space", Some(a), translation(0.0, 1.0, 0.0), Space::Local)
        .unwrap();
    hierarchy.add_parent(null, b, 0.5, false).unwrap();
    hierarchy
        .add_control(
            "ctrl",
            Some(null),
            ControlSettings::default(),
            ControlValue::Transform(translation(0.0, 0.0, 1.0)),
            translation(1.0, 0.0, 0.0),
            translation(0.0, 1.0, 0.0),
        )
        .unwrap();
    hierarchy.add_curve("blink", 0.25).unwrap();
    hierarchy
}

#[test]
fn computing_all_transforms_leaves_nothing_dirty() {
    let mut hierarchy = mixed_rig();
    hierarchy.compute_all_transforms();

    for index in 0..hierarchy.num() {
        for kind in TransformKind::ALL {
            assert!(
                !hierarchy.is_transform_dirty(index, kind),
                "element {index} still dirty in {kind:?}"
            );
        }
    }

    hierarchy.reset_stats();
    hierarchy.compute_all_transforms();
    assert_eq!(hierarchy.stats().slot_recomputes, 0);
}

#[test]
fn reset_restores_the_initial_pose() {
    let (mut hierarchy, a, _, c) = three_bone_chain();
    hierarchy.set_transform(
        a,
        translation(0.0, 5.0, 0.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );
    hierarchy.set_transform(
        c,
        translation(3.0, 0.0, 0.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );

    hierarchy.reset_pose_to_initial(ElementTypeFilter::ALL);

    for index in [a, c] {
        assert_transform_approx(
            hierarchy.get_transform(index, TransformKind::CurrentLocal),
            hierarchy.get_transform(index, TransformKind::InitialLocal),
        );
    }
    assert_transform_approx(
        hierarchy.get_transform(c, TransformKind::CurrentGlobal),
        translation(2.0, 0.0, 0.0),
    );
}

#[test]
fn reset_restores_control_offsets() {
    let mut hierarchy = mixed_rig();
    let control = hierarchy.get_index_by_name("ctrl", ElementType::Control).unwrap();
    hierarchy.set_control_offset_transform(
        control,
        translation(0.0, 0.0, 9.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );

    hierarchy.reset_pose_to_initial(ElementTypeFilter::ALL);

    assert_transform_approx(
        hierarchy.get_control_offset_transform(control, TransformKind::CurrentLocal),
        translation(1.0, 0.0, 0.0),
    );
}

#[test]
fn filtered_reset_keeps_unfiltered_children_in_place() {
    let mut hierarchy = RigHierarchy::new();
    let root = hierarchy
        .add_bone("root", None, Transform::IDENTITY, Space::Local)
        .unwrap();
    let control = hierarchy
        .add_control(
            "ctrl",
            Some(root),
            ControlSettings::default(),
            ControlValue::Transform(translation(1.0, 0.0, 0.0)),
            Transform::IDENTITY,
            Transform::IDENTITY,
        )
        .unwrap();
    hierarchy.set_transform(
        root,
        translation(0.0, 5.0, 0.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );
    assert_transform_approx(
        hierarchy.get_transform(control, TransformKind::CurrentGlobal),
        translation(1.0, 5.0, 0.0),
    );

    hierarchy.reset_pose_to_initial(ElementTypeFilter::only(ElementType::Bone));

    assert_transform_approx(
        hierarchy.get_transform(root, TransformKind::CurrentGlobal),
        Transform::IDENTITY,
    );
    assert_transform_approx(
        hierarchy.get_transform(control, TransformKind::CurrentGlobal),
        translation(1.0, 5.0, 0.0),
    );
    assert_transform_approx(
        hierarchy.get_transform(control, TransformKind::CurrentLocal),
        translation(1.0, 5.0, 0.0),
    );
}

#[test]
fn copy_pose_takes_only_the_requested_pose() {
    let mut source = mixed_rig();
    let mut target = mixed_rig();
    let a = source.get_index_by_name("a", ElementType::Bone).unwrap();
    source.set_transform(
        a,
        translation(0.0, 0.0, 7.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );
    source.set_transform(
        a,
        translation(0.0, 0.0, -1.0),
        TransformKind::InitialLocal,
        true,
        false,
        false,
    );
    let curve = source.get_index_by_name("blink", ElementType::Curve).unwrap();
    source.set_curve_value(curve, 0.75, false, false);

    target.copy_pose(&source, true, false);

    let c = target.get_index_by_name("c", ElementType::Bone).unwrap();
    assert_transform_approx(
        target.get_transform(c, TransformKind::CurrentGlobal),
        translation(2.0, 0.0, 7.0),
    );
    assert_transform_approx(
        target.get_transform(c, TransformKind::InitialGlobal),
        translation(2.0, 0.0, 0.0),
    );
    assert_approx(target.get_curve_value(curve), 0.75);

    let control = target.get_index_by_name("ctrl", ElementType::Control).unwrap();
    let expected = source.get_transform(control, TransformKind::CurrentGlobal);
    assert_transform_approx(
        target.get_transform(control, TransformKind::CurrentGlobal),
        expected,
    );
}

#[test]
fn snapshots_replay_onto_a_matching_rig() {
    let (mut source, a, _, c) = three_bone_chain();
    source.set_transform(
        a,
        translation(0.0, 4.0, 0.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );
    let pose = source.get_pose(false, ElementTypeFilter::ALL, &[]);
    assert_eq!(pose.len(), 3);
    assert_eq!(pose.format_version, POSE_FORMAT_VERSION);
    assert!(pose.is_compatible_with(&source));
    let entry = pose.find(&ElementKey::new("c", ElementType::Bone)).unwrap();
    assert_transform_approx(entry.global, translation(2.0, 4.0, 0.0));

    let (mut target, _, _, _) = three_bone_chain();
    target
        .set_pose_checked(&pose, TransformKind::CurrentLocal, 1.0)
        .unwrap();
    assert_transform_approx(
        target.get_transform(c, TransformKind::CurrentGlobal),
        translation(2.0, 4.0, 0.0),
    );
}

#[test]
fn partial_weight_blends_towards_the_snapshot() {
    let (mut source, a, _, _) = three_bone_chain();
    source.set_transform(
        a,
        translation(0.0, 4.0, 0.0),
        TransformKind::CurrentLocal,
        true,
        false,
        false,
    );
    let pose = source.get_pose(false, ElementTypeFilter::ALL, &[]);

    let (mut target, _, _, _) = three_bone_chain();
    target.set_pose(&pose, TransformKind::CurrentGlobal, ElementTypeFilter::ALL, &[], 0.5);
    assert_transform_approx(
        target.get_transform(a, TransformKind::CurrentGlobal),
        translation(0.0, 2.0, 0.0),
    );

    let (mut untouched, _, _, _) = three_bone_chain();
    untouched.set_pose(&pose, TransformKind::CurrentLocal, ElementTypeFilter::ALL, &[], 0.0);
    assert_transform_approx(
        untouched.get_transform(a, TransformKind::CurrentLocal),
        Transform::IDENTITY,
    );
}

#[test]
fn snapshots_respect_filters_and_items() {
    let mut hierarchy = mixed_rig();
    let only_bones = hierarchy.get_pose(true, ElementType::Bone.into(), &[]);
    assert_eq!(only_bones.len(), 3);

    let key = ElementKey::new("ctrl", ElementType::Control);
    let single = hierarchy.get_pose(true, ElementTypeFilter::ALL, std::slice::from_ref(&key));
    assert_eq!(single.len(), 1);
    assert_eq!(single.elements[0].key, key);

    let curve = hierarchy.get_pose(false, ElementTypeFilter::only(ElementType::Curve), &[]);
    assert_approx(curve.elements[0].curve_value, 0.25);
}

#[test]
fn checked_application_rejects_foreign_snapshots() {
    let mut hierarchy = mixed_rig();
    let (mut other, _, _, _) = three_bone_chain();
    let pose = other.get_pose(false, ElementTypeFilter::ALL, &[]);
    assert!(!pose.is_compatible_with(&hierarchy));
    assert!(matches!(
        hierarchy.set_pose_checked(&pose, TransformKind::CurrentLocal, 1.0),
        Err(Error::IncompatiblePose { .. })
    ));

    let mut future = hierarchy.get_pose(false, ElementTypeFilter::ALL, &[]);
    future.format_version = POSE_FORMAT_VERSION + 1;
    assert!(matches!(
        hierarchy.set_pose_checked(&future, TransformKind::CurrentLocal, 1.0),
        Err(Error::UnsupportedPoseVersion { found, .. }) if found == POSE_FORMAT_VERSION + 1
    ));
}

#[test]
fn topology_hash_ignores_insertion_order() {
    let mut first = RigHierarchy::new();
    first.add_bone("x", None, Transform::IDENTITY, Space::Local).unwrap();
    first.add_bone("y", None, Transform::IDENTITY, Space::Local).unwrap();

    let mut second = RigHierarchy::new();
    second.add_bone("y", None, Transform::IDENTITY, Space::Local).unwrap();
    second.add_bone("x", None, Transform::IDENTITY, Space::Local).unwrap();
    assert_eq!(first.topology_hash(), second.topology_hash());

    let mut nested = RigHierarchy::new();
    let x = nested.add_bone("x", None, Transform::IDENTITY, Space::Local).unwrap();
    nested.add_bone("y", Some(x), Transform::IDENTITY, Space::Local).unwrap();
    assert_ne!(first.topology_hash(), nested.topology_hash());
}

#[test]
fn curve_values() {
    let mut hierarchy = mixed_rig();
    let curve = hierarchy.get_index_by_name("blink", ElementType::Curve).unwrap();
    assert_approx(hierarchy.get_curve_value(curve), 0.25);
    assert_approx(hierarchy.get_curve_value(0), 0.0);

    hierarchy.set_curve_value(curve, 1.0, false, false);
    let pose = hierarchy.get_pose(false, ElementTypeFilter::ALL, &[]);
    hierarchy.reset_curve_values();
    assert_approx(hierarchy.get_curve_value(curve), 0.0);

    hierarchy.set_pose(&pose, TransformKind::CurrentLocal, ElementTypeFilter::ALL, &[], 0.5);
    assert_approx(hierarchy.get_curve_value(curve), 0.5);

    hierarchy.set_pose(&pose, TransformKind::InitialLocal, ElementTypeFilter::ALL, &[], 1.0);
    assert_approx(hierarchy.get_curve_value(curve), 0.5);
}

#[cfg(feature = "json")]
#[test]
fn snapshots_survive_json() {
    let mut hierarchy = mixed_rig();
    let pose = hierarchy.get_pose(false, ElementTypeFilter::ALL, &[]);

    let json = pose.to_json_string().unwrap();
    assert!(json.contains("\"ctrl\""));
    let parsed = crate::RigPose::from_json_str(&json).unwrap();
    assert_eq!(parsed.len(), pose.len());
    assert_eq!(parsed.topology_hash, pose.topology_hash);
    for (a, b) in parsed.elements.iter().zip(&pose.elements) {
        assert_eq!(a.key, b.key);
        assert_transform_approx(a.global, b.global);
    }
    assert!(parsed.is_compatible_with(&hierarchy));
}

#[cfg(feature = "json")]
#[test]
fn malformed_or_future_json_is_rejected() {
    assert!(matches!(
        crate::RigPose::from_json_str("{ not json"),
        Err(Error::PoseParse { .. })
    ));

    let mut hierarchy = mixed_rig();
    let mut pose = hierarchy.get_pose(false, ElementTypeFilter::ALL, &[]);
    pose.format_version = 42;
    let json = pose.to_json_string().unwrap();
    assert!(matches!(
        crate::RigPose::from_json_str(&json),
        Err(Error::UnsupportedPoseVersion { found: 42, .. })
    ));
}
