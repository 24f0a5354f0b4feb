//! Control value types and their mapping onto a local transform.

use glam::{EulerRot, Quat, Vec2, Vec3};

use crate::{SMALL_NUMBER, Transform};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ControlType {
    Bool,
    Float,
    Integer,
    Vector2D,
    Position,
    Scale,
    Rotator,
    #[default]
    Transform,
    TransformNoScale,
}

/// Axis along which one-dimensional control values act. For [`ControlType::Vector2D`]
/// it is the axis left out.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlValueKind {
    Current,
    Initial,
    Minimum,
    Maximum,
}

/// A control's value in its native representation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ControlValue {
    Bool(bool),
    Float(f32),
    Integer(i32),
    Vector2D(Vec2),
    Position(Vec3),
    Scale(Vec3),
    /// Euler angles in degrees: x = roll, y = pitch, z = yaw.
    Rotator(Vec3),
    Transform(Transform),
    TransformNoScale(Transform),
}

impl ControlValue {
    /// The value that maps onto an identity local transform.
    pub fn identity(control_type: ControlType) -> Self {
        match control_type {
            ControlType::Bool => Self::Bool(false),
            ControlType::Float => Self::Float(0.0),
            ControlType::Integer => Self::Integer(0),
            ControlType::Vector2D => Self::Vector2D(Vec2::ZERO),
            ControlType::Position => Self::Position(Vec3::ZERO),
            ControlType::Scale => Self::Scale(Vec3::ONE),
            ControlType::Rotator => Self::Rotator(Vec3::ZERO),
            ControlType::Transform => Self::Transform(Transform::IDENTITY),
            ControlType::TransformNoScale => Self::TransformNoScale(Transform::IDENTITY),
        }
    }

    pub fn control_type(&self) -> ControlType {
        match self {
            Self::Bool(_) => ControlType::Bool,
            Self::Float(_) => ControlType::Float,
            Self::Integer(_) => ControlType::Integer,
            Self::Vector2D(_) => ControlType::Vector2D,
            Self::Position(_) => ControlType::Position,
            Self::Scale(_) => ControlType::Scale,
            Self::Rotator(_) => ControlType::Rotator,
            Self::Transform(_) => ControlType::Transform,
            Self::TransformNoScale(_) => ControlType::TransformNoScale,
        }
    }

    pub fn to_transform(&self, primary_axis: Axis) -> Transform {
        match *self {
            Self::Bool(value) => {
                Transform::from_translation(Vec3::new(if value { 1.0 } else { 0.0 }, 0.0, 0.0))
            }
            Self::Float(value) => Transform::from_translation(axis_vector(primary_axis, value)),
            Self::Integer(value) => {
                Transform::from_translation(axis_vector(primary_axis, value as f32))
            }
            Self::Vector2D(value) => {
                let translation = match primary_axis {
                    Axis::X => Vec3::new(0.0, value.x, value.y),
                    Axis::Y => Vec3::new(value.x, 0.0, value.y),
                    Axis::Z => Vec3::new(value.x, value.y, 0.0),
                };
                Transform::from_translation(translation)
            }
            Self::Position(value) => Transform::from_translation(value),
            Self::Scale(value) => Transform::from_scale(value),
            Self::Rotator(value) => Transform::from_rotation(euler_degrees_to_quat(value)),
            Self::Transform(value) => value,
            Self::TransformNoScale(value) => Transform {
                scale: Vec3::ONE,
                ..value
            },
        }
    }

    pub fn from_transform(
        transform: &Transform,
        control_type: ControlType,
        primary_axis: Axis,
    ) -> Self {
        let t = transform.translation;
        match control_type {
            ControlType::Bool => Self::Bool(t.x > SMALL_NUMBER),
            ControlType::Float => Self::Float(axis_component(primary_axis, t)),
            ControlType::Integer => Self::Integer(axis_component(primary_axis, t).round() as i32),
            ControlType::Vector2D => Self::Vector2D(match primary_axis {
                Axis::X => Vec2::new(t.y, t.z),
                Axis::Y => Vec2::new(t.x, t.z),
                Axis::Z => Vec2::new(t.x, t.y),
            }),
            ControlType::Position => Self::Position(t),
            ControlType::Scale => Self::Scale(transform.scale),
            ControlType::Rotator => Self::Rotator(quat_to_euler_degrees(transform.rotation)),
            ControlType::Transform => Self::Transform(*transform),
            ControlType::TransformNoScale => Self::TransformNoScale(Transform {
                scale: Vec3::ONE,
                ..*transform
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlSettings {
    pub control_type: ControlType,
    pub primary_axis: Axis,
    pub display_name: Option<String>,
    pub limit_translation: bool,
    pub limit_rotation: bool,
    pub limit_scale: bool,
    pub minimum_value: ControlValue,
    pub maximum_value: ControlValue,
    pub gizmo_visible: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self::new(ControlType::default())
    }
}

impl ControlSettings {
    pub fn new(control_type: ControlType) -> Self {
        Self {
            control_type,
            primary_axis: Axis::X,
            display_name: None,
            limit_translation: false,
            limit_rotation: false,
            limit_scale: false,
            minimum_value: ControlValue::identity(control_type),
            maximum_value: ControlValue::identity(control_type),
            gizmo_visible: true,
        }
    }

    pub fn with_limits(mut self, minimum: ControlValue, maximum: ControlValue) -> Self {
        self.minimum_value = minimum;
        self.maximum_value = maximum;
        self.limit_translation = true;
        self.limit_rotation = true;
        self.limit_scale = true;
        self
    }

    pub fn has_limits(&self) -> bool {
        self.limit_translation || self.limit_rotation || self.limit_scale
    }

    /// Clamps `value` into `[minimum_value, maximum_value]` on every limited channel.
    /// Values whose type differs from the limit values are left alone.
    pub fn apply_limits(&self, value: &mut ControlValue) {
        use ControlValue as V;

        match (value, &self.minimum_value, &self.maximum_value) {
            (V::Float(v), V::Float(min), V::Float(max)) if self.limit_translation => {
                *v = clamp_f32(*v, *min, *max);
            }
            (V::Integer(v), V::Integer(min), V::Integer(max)) if self.limit_translation => {
                *v = (*v).max(*min).min(*max);
            }
            (V::Vector2D(v), V::Vector2D(min), V::Vector2D(max)) if self.limit_translation => {
                *v = (*v).max(*min).min(*max);
            }
            (V::Position(v), V::Position(min), V::Position(max)) if self.limit_translation => {
                *v = (*v).max(*min).min(*max);
            }
            (V::Scale(v), V::Scale(min), V::Scale(max)) if self.limit_scale => {
                *v = (*v).max(*min).min(*max);
            }
            (V::Rotator(v), V::Rotator(min), V::Rotator(max)) if self.limit_rotation => {
                *v = (*v).max(*min).min(*max);
            }
            (V::Transform(v), V::Transform(min), V::Transform(max))
            | (V::TransformNoScale(v), V::TransformNoScale(min), V::TransformNoScale(max)) => {
                self.limit_transform(v, min, max);
            }
            _ => {}
        }
    }

    /// Projects a local transform onto this control's value type, clamps it and maps it back.
    /// Controls without any limit flag pass the transform through untouched.
    pub fn apply_limits_to_transform(&self, transform: &mut Transform) {
        if !self.has_limits() {
            return;
        }
        let mut value = ControlValue::from_transform(transform, self.control_type, self.primary_axis);
        self.apply_limits(&mut value);
        *transform = value.to_transform(self.primary_axis);
    }

    fn limit_transform(&self, value: &mut Transform, min: &Transform, max: &Transform) {
        if self.limit_translation {
            value.translation = value.translation.max(min.translation).min(max.translation);
        }
        if self.limit_rotation {
            let euler = quat_to_euler_degrees(value.rotation);
            let clamped = euler
                .max(quat_to_euler_degrees(min.rotation))
                .min(quat_to_euler_degrees(max.rotation));
            if !clamped.abs_diff_eq(euler, 1e-5) {
                value.rotation = euler_degrees_to_quat(clamped);
            }
        }
        if self.limit_scale {
            value.scale = value.scale.max(min.scale).min(max.scale);
        }
    }
}

pub(crate) fn euler_degrees_to_quat(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

pub(crate) fn quat_to_euler_degrees(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

fn axis_vector(axis: Axis, value: f32) -> Vec3 {
    match axis {
        Axis::X => Vec3::new(value, 0.0, 0.0),
        Axis::Y => Vec3::new(0.0, value, 0.0),
        Axis::Z => Vec3::new(0.0, 0.0, value),
    }
}

fn axis_component(axis: Axis, v: Vec3) -> f32 {
    match axis {
        Axis::X => v.x,
        Axis::Y => v.y,
        Axis::Z => v.z,
    }
}

fn clamp_f32(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
