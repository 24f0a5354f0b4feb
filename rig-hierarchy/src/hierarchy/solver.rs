//! Weighted blending of parent constraints into a single parent space.
//!
//! Every channel (location, rotation, scale) is blended on its own: one contributing
//! parent is copied, two are interpolated, more are averaged by normalized weight with
//! hemisphere-corrected quaternion accumulation.

use glam::{Quat, Vec3};

use super::element::ParentConstraint;
use super::store::RigHierarchy;
use crate::math::normalize_quat;
use crate::model::Channel;
use crate::{SMALL_NUMBER, Transform, TransformKind};

/// Supplies the global transform of a parent while a solve is running.
pub(crate) trait ParentResolver {
    fn parent_global(&mut self, parent: usize, kind: TransformKind) -> Transform;
}

impl ParentResolver for RigHierarchy {
    fn parent_global(&mut self, parent: usize, kind: TransformKind) -> Transform {
        self.get_transform(parent, kind.make_global())
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct ChannelIndices {
    count: usize,
    first: Option<usize>,
    second: Option<usize>,
    total_weight: f32,
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ConstraintIndices {
    channels: [ChannelIndices; 3],
}

impl ConstraintIndices {
    fn has_any_parent(&self) -> bool {
        self.channels.iter().any(|c| c.count > 0)
    }
}

/// Counts contributing constraints per channel and resets the per-solve parent memo.
pub(crate) fn compute_parent_constraint_indices(
    constraints: &mut [ParentConstraint],
    initial: bool,
) -> ConstraintIndices {
    let mut indices = ConstraintIndices::default();
    for (index, constraint) in constraints.iter_mut().enumerate() {
        constraint.cache.dirty = true;
        let weight = constraint.weight(initial);
        for channel in Channel::ALL {
            let value = weight.channel(channel);
            if value <= 0.0 {
                continue;
            }
            let summary = &mut indices.channels[channel.index()];
            match summary.count {
                0 => summary.first = Some(index),
                1 => summary.second = Some(index),
                _ => {}
            }
            summary.count += 1;
            summary.total_weight += value;
        }
    }
    indices
}

/// Blended parent space composed forward with the optional offset and pose:
/// each parent contributes `pose * offset * parent_global`. Channels without a
/// contributing parent take `pose * offset`.
pub(crate) fn solve_parent_constraints<R: ParentResolver>(
    resolver: &mut R,
    constraints: &mut [ParentConstraint],
    kind: TransformKind,
    local_offset: Option<Transform>,
    local_pose: Option<Transform>,
) -> Transform {
    let indices = compute_parent_constraint_indices(constraints, kind.is_initial());
    let mut default = local_offset.unwrap_or(Transform::IDENTITY);
    if let Some(pose) = local_pose {
        default = pose * default;
    }
    let space = ParentSpace {
        kind,
        offset: local_offset,
        pose: local_pose,
    };
    space
        .blend(resolver, constraints, &indices, default)
        .with_normalized_rotation()
}

/// Inverse of [`solve_parent_constraints`] for the pose. Each channel is taken from
/// `global` expressed relative to that channel's own blended parent space, where every
/// parent contributes `offset * parent_global`. Channels without a contributing parent
/// are relative to the offset alone.
pub(crate) fn inverse_solve_parent_constraints<R: ParentResolver>(
    resolver: &mut R,
    global: Transform,
    constraints: &mut [ParentConstraint],
    kind: TransformKind,
    local_offset: Option<Transform>,
) -> Transform {
    let indices = compute_parent_constraint_indices(constraints, kind.is_initial());
    let mut result = global.relative_to(&local_offset.unwrap_or(Transform::IDENTITY));
    if !indices.has_any_parent() {
        return result.with_normalized_rotation();
    }

    let space = ParentSpace {
        kind,
        offset: local_offset,
        pose: None,
    };
    for channel in Channel::ALL {
        let summary = &indices.channels[channel.index()];
        let Some(parent) = space.mix_channel(resolver, constraints, summary, channel) else {
            continue;
        };
        let relative = global.relative_to(&parent);
        match channel {
            Channel::Location => result.translation = relative.translation,
            Channel::Rotation => result.rotation = relative.rotation,
            Channel::Scale => result.scale = relative.scale,
        }
    }
    result.with_normalized_rotation()
}

/// Blend parameter towards `b`. Falls back to `a` when neither side carries weight.
pub(crate) fn weight_for_lerp(a: f32, b: f32) -> f32 {
    let a = a.max(0.0);
    let b = b.max(0.0);
    let total = a + b;
    if total > SMALL_NUMBER { b / total } else { 0.0 }
}

struct ParentSpace {
    kind: TransformKind,
    offset: Option<Transform>,
    pose: Option<Transform>,
}

impl ParentSpace {
    fn blend<R: ParentResolver>(
        &self,
        resolver: &mut R,
        constraints: &mut [ParentConstraint],
        indices: &ConstraintIndices,
        default: Transform,
    ) -> Transform {
        let mut result = default;
        if !indices.has_any_parent() {
            return result;
        }

        for channel in Channel::ALL {
            let summary = &indices.channels[channel.index()];
            let Some(mixed) = self.mix_channel(resolver, constraints, summary, channel) else {
                continue;
            };
            match channel {
                Channel::Location => result.translation = mixed.translation,
                Channel::Rotation => result.rotation = mixed.rotation,
                Channel::Scale => result.scale = mixed.scale,
            }
        }
        result
    }

    /// Full parent contribution blended with the weights of `channel`.
    fn mix_channel<R: ParentResolver>(
        &self,
        resolver: &mut R,
        constraints: &mut [ParentConstraint],
        summary: &ChannelIndices,
        channel: Channel,
    ) -> Option<Transform> {
        let initial = self.kind.is_initial();
        match (summary.count, summary.first, summary.second) {
            (0, _, _) => None,
            (1, Some(a), _) => Some(self.lazily_compute(resolver, constraints, a)),
            (2, Some(a), Some(b)) => {
                let transform_a = self.lazily_compute(resolver, constraints, a);
                let transform_b = self.lazily_compute(resolver, constraints, b);
                let t = weight_for_lerp(
                    constraints[a].weight(initial).channel(channel),
                    constraints[b].weight(initial).channel(channel),
                );
                Some(transform_a.lerp(&transform_b, t))
            }
            _ => {
                debug_assert!(
                    summary.total_weight > SMALL_NUMBER,
                    "contributing parents carry no weight"
                );
                if summary.total_weight <= SMALL_NUMBER {
                    return None;
                }

                let mut location = Vec3::ZERO;
                let mut scale = Vec3::ZERO;
                let mut rotation = QuatAccumulator::default();
                for index in 0..constraints.len() {
                    let weight = constraints[index].weight(initial).channel(channel);
                    if weight <= 0.0 {
                        continue;
                    }
                    let transform = self.lazily_compute(resolver, constraints, index);
                    let normalized = weight / summary.total_weight;
                    location += transform.translation * normalized;
                    rotation.add(transform.rotation, normalized);
                    scale += transform.scale * normalized;
                }
                Some(Transform::new(location, rotation.finish(), scale))
            }
        }
    }

    fn lazily_compute<R: ParentResolver>(
        &self,
        resolver: &mut R,
        constraints: &mut [ParentConstraint],
        index: usize,
    ) -> Transform {
        let constraint = &mut constraints[index];
        if constraint.cache.dirty {
            let mut transform = resolver.parent_global(constraint.parent, self.kind);
            if let Some(offset) = self.offset {
                transform = offset * transform;
            }
            if let Some(pose) = self.pose {
                transform = pose * transform;
            }
            constraint.cache.transform = transform;
            constraint.cache.dirty = false;
        }
        constraint.cache.transform
    }
}

/// Weighted quaternion sum. Contributions in the opposite hemisphere of the first one
/// are flipped so that `q` and `-q` do not cancel out.
#[derive(Default)]
struct QuatAccumulator {
    reference: Option<Quat>,
    sum: Option<Quat>,
}

impl QuatAccumulator {
    fn add(&mut self, rotation: Quat, weight: f32) {
        let rotation = normalize_quat(rotation);
        let reference = *self.reference.get_or_insert(rotation);
        let weight = if rotation.dot(reference) < 0.0 {
            -weight
        } else {
            weight
        };
        let contribution = rotation * weight;
        self.sum = Some(match self.sum {
            Some(sum) => sum + contribution,
            None => contribution,
        });
    }

    fn finish(self) -> Quat {
        self.sum.map_or(Quat::IDENTITY, normalize_quat)
    }
}

impl RigHierarchy {
    /// Runs the forward solve over the constraints of `index`. Elements without parent
    /// constraints yield `pose * offset`.
    pub(crate) fn solve_constraints_of(
        &mut self,
        index: usize,
        kind: TransformKind,
        local_offset: Option<Transform>,
        local_pose: Option<Transform>,
    ) -> Transform {
        let Some(multi) = self.multi_parent_mut(index) else {
            let offset = local_offset.unwrap_or(Transform::IDENTITY);
            return local_pose.map_or(offset, |pose| pose * offset);
        };
        let mut constraints = std::mem::take(&mut multi.constraints);
        self.stats.solver_invocations += 1;
        let result =
            solve_parent_constraints(self, &mut constraints, kind, local_offset, local_pose);
        if let Some(multi) = self.multi_parent_mut(index) {
            multi.constraints = constraints;
        }
        result
    }

    pub(crate) fn inverse_solve_constraints_of(
        &mut self,
        index: usize,
        global: Transform,
        kind: TransformKind,
        local_offset: Option<Transform>,
    ) -> Transform {
        let Some(multi) = self.multi_parent_mut(index) else {
            let parent = local_offset.unwrap_or(Transform::IDENTITY);
            return global.relative_to(&parent).with_normalized_rotation();
        };
        let mut constraints = std::mem::take(&mut multi.constraints);
        self.stats.solver_invocations += 1;
        let result =
            inverse_solve_parent_constraints(self, global, &mut constraints, kind, local_offset);
        if let Some(multi) = self.multi_parent_mut(index) {
            multi.constraints = constraints;
        }
        result
    }
}
