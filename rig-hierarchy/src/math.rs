//! Rigid transform with non-uniform scale, composed child-first.

use glam::{Quat, Vec3};

/// Guard for divisions and degenerate weights.
pub const SMALL_NUMBER: f32 = 1e-8;

/// Tolerance used when deciding whether a transform write actually changes anything.
pub const TRANSFORM_EQUALS_TOLERANCE: f32 = 1e-4;

/// Translation, rotation and (possibly non-uniform) scale.
///
/// `child * parent` applies `child` first and then `parent`, so a local transform
/// multiplied by its parent's global transform yields the child's global transform.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    /// Expresses `self` in the space of `other`, so that `self.relative_to(p) * p == self`.
    pub fn relative_to(&self, other: &Transform) -> Transform {
        let recip = safe_scale_reciprocal(other.scale);
        let inverse_rotation = other.rotation.inverse();
        Transform {
            translation: (inverse_rotation * (self.translation - other.translation)) * recip,
            rotation: inverse_rotation * self.rotation,
            scale: self.scale * recip,
        }
    }

    /// `self.inverse() * self` is the identity.
    pub fn inverse(&self) -> Transform {
        Transform::IDENTITY.relative_to(self)
    }

    pub fn normalize_rotation(&mut self) {
        self.rotation = normalize_quat(self.rotation);
    }

    pub fn with_normalized_rotation(mut self) -> Transform {
        self.normalize_rotation();
        self
    }

    /// Linear on translation and scale, shortest-arc slerp on rotation.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, t),
            rotation: normalize_quat(self.rotation)
                .slerp(normalize_quat(other.rotation), t)
                .normalize(),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Component-wise comparison. `q` and `-q` describe the same rotation and compare equal.
    pub fn equals(&self, other: &Transform, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && quat_equals(self.rotation, other.rotation, tolerance)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, parent: Transform) -> Transform {
        Transform {
            translation: parent.rotation * (parent.scale * self.translation) + parent.translation,
            rotation: parent.rotation * self.rotation,
            scale: self.scale * parent.scale,
        }
    }
}

pub(crate) fn quat_equals(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.abs_diff_eq(b, tolerance) || a.abs_diff_eq(-b, tolerance)
}

pub(crate) fn normalize_quat(q: Quat) -> Quat {
    let length_squared = q.length_squared();
    if length_squared <= SMALL_NUMBER || !length_squared.is_finite() {
        Quat::IDENTITY
    } else {
        q * length_squared.sqrt().recip()
    }
}

fn safe_scale_reciprocal(scale: Vec3) -> Vec3 {
    let recip = |v: f32| if v.abs() <= SMALL_NUMBER { 0.0 } else { 1.0 / v };
    Vec3::new(recip(scale.x), recip(scale.y), recip(scale.z))
}
