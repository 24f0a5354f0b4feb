use glam::{Quat, Vec3};

use crate::{RigHierarchy, Space, Transform};

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 0.001,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

pub(crate) fn assert_vec3_approx(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 0.001),
        "expected {expected:?}, got {actual:?}"
    );
}

pub(crate) fn assert_transform_approx(actual: Transform, expected: Transform) {
    assert!(
        actual.equals(&expected, 0.001),
        "expected {expected:?}, got {actual:?}"
    );
}

pub(crate) fn translation(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_translation(Vec3::new(x, y, z))
}

pub(crate) fn rotated_z(degrees: f32) -> Quat {
    Quat::from_rotation_z(degrees.to_radians())
}

/// Root bone `a` at the origin with child `b` one unit along x and grandchild `c`
/// one more unit along x.
pub(crate) fn three_bone_chain() -> (RigHierarchy, usize, usize, usize) {
    let mut hierarchy = RigHierarchy::new();
    let a = hierarchy
        .add_bone("a", None, Transform::IDENTITY, Space::Local)
        .unwrap();
    let b = hierarchy
        .add_bone("b", Some(a), translation(1.0, 0.0, 0.0), Space::Local)
        .unwrap();
    let c = hierarchy
        .add_bone("c", Some(b), translation(1.0, 0.0, 0.0), Space::Local)
        .unwrap();
    (hierarchy, a, b, c)
}
