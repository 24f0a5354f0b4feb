//! Compute-on-read, propagate-on-write access to the cached transforms.

use super::element::ParentLink;
use super::stack::{TransformStackEntryType, TransformStackValue};
use super::store::RigHierarchy;
use crate::{TRANSFORM_EQUALS_TOLERANCE, Transform, TransformKind};

impl RigHierarchy {
    /// Returns the requested slot, recomputing it from the opposite slot if it is dirty.
    ///
    /// Only the requested slot (and caches it depends on) is written. Indices that do not
    /// resolve to a transform-bearing element yield identity.
    pub fn get_transform(&mut self, index: usize, kind: TransformKind) -> Transform {
        let Some(element) = self.transform_element(index) else {
            return Transform::IDENTITY;
        };
        if !element.pose.is_dirty(kind) {
            return element.pose.get(kind);
        }

        let opposed = kind.swap_local_and_global();
        debug_assert!(
            !element.pose.is_dirty(opposed),
            "both {kind:?} and {opposed:?} are dirty for element {index}"
        );
        let opposed_value = element.pose.get(opposed);
        let is_control = element.control.is_some();
        let global_kind = kind.make_global();
        self.stats.slot_recomputes += 1;

        let computed = if kind.is_local() {
            if is_control {
                self.compute_local_control_value(index, opposed_value, global_kind)
            } else {
                let parent = self.get_parent_transform(index, global_kind);
                opposed_value.relative_to(&parent).with_normalized_rotation()
            }
        } else if is_control {
            let offset = self.get_control_offset_transform(index, opposed);
            self.solve_constraints_of(index, kind, Some(offset), Some(opposed_value))
        } else {
            let parent = self.get_parent_transform(index, global_kind);
            (opposed_value * parent).with_normalized_rotation()
        };

        if let Some(element) = self.transform_element_mut(index) {
            element.pose.set(kind, computed);
        }
        computed
    }

    pub fn get_local_transform(&mut self, index: usize) -> Transform {
        self.get_transform(index, TransformKind::CurrentLocal)
    }

    pub fn get_global_transform(&mut self, index: usize) -> Transform {
        self.get_transform(index, TransformKind::CurrentGlobal)
    }

    /// Whether the slot currently holds a stale value. Absent elements report `false`.
    pub fn is_transform_dirty(&self, index: usize, kind: TransformKind) -> bool {
        self.transform_element(index)
            .is_some_and(|element| element.pose.is_dirty(kind))
    }

    /// Writes one slot and invalidates what depends on it.
    ///
    /// Nothing happens when the slot is clean and already holds `transform` within
    /// tolerance, unless `force` is set. A global write on a control is converted to
    /// the control's local space (limits applied) first.
    pub fn set_transform(
        &mut self,
        index: usize,
        transform: Transform,
        kind: TransformKind,
        affect_children: bool,
        setup_undo: bool,
        force: bool,
    ) {
        let Some(element) = self.transform_element(index) else {
            return;
        };

        if kind.is_global() {
            if let Some(control) = element.control.as_deref() {
                let settings = control.settings.clone();
                let mut local = self.compute_local_control_value(index, transform, kind);
                settings.apply_limits_to_transform(&mut local);
                self.set_transform(
                    index,
                    local,
                    kind.make_local(),
                    affect_children,
                    setup_undo,
                    force,
                );
                return;
            }
        }

        if !force
            && !element.pose.is_dirty(kind)
            && element
                .pose
                .get(kind)
                .equals(&transform, TRANSFORM_EQUALS_TOLERANCE)
        {
            return;
        }

        let is_control = element.control.is_some();
        let previous = self.get_transform(index, kind);
        if is_control {
            self.get_control_gizmo_transform(index, kind.make_local());
        }
        self.propagate_dirty_flags(index, kind.is_initial(), affect_children);

        let Some(element) = self.transform_element_mut(index) else {
            return;
        };
        element.pose.set(kind, transform);
        element.pose.mark_dirty(kind.swap_local_and_global());
        if let Some(control) = element.control.as_mut() {
            control.gizmo.mark_dirty(kind.make_global());
        }

        if setup_undo {
            self.push_transform_to_stack(
                index,
                TransformStackEntryType::Pose,
                kind,
                TransformStackValue::Transform(previous),
                TransformStackValue::Transform(transform),
                affect_children,
            );
        }

        self.broadcast(index, Some(kind), |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_transform(target, transform, kind, affect_children, false, force);
            }
        });
    }

    /// Blended parent space of `index`. The local/global half of `kind` is ignored, the
    /// parent space is always global.
    pub fn get_parent_transform(&mut self, index: usize, kind: TransformKind) -> Transform {
        let global_kind = kind.make_global();
        let Some(element) = self.transform_element(index) else {
            return Transform::IDENTITY;
        };
        match &element.parent {
            ParentLink::Single(Some(parent)) => {
                let parent = *parent;
                self.get_transform(parent, global_kind)
            }
            ParentLink::Single(None) => Transform::IDENTITY,
            ParentLink::Multi(multi) => {
                if !multi.parent_cache.is_dirty(global_kind) {
                    return multi.parent_cache.get(global_kind);
                }
                self.stats.slot_recomputes += 1;
                let parent = self.solve_constraints_of(index, global_kind, None, None);
                if let Some(multi) = self.multi_parent_mut(index) {
                    multi.parent_cache.set(global_kind, parent);
                }
                parent
            }
        }
    }

    /// Offset of a control, between its parent space and its pose. Identity for
    /// anything that is not a control.
    pub fn get_control_offset_transform(&mut self, index: usize, kind: TransformKind) -> Transform {
        let Some(control) = self.control_element(index) else {
            return Transform::IDENTITY;
        };
        if !control.offset.is_dirty(kind) {
            return control.offset.get(kind);
        }

        let opposed = kind.swap_local_and_global();
        debug_assert!(
            !control.offset.is_dirty(opposed),
            "both offset {kind:?} and {opposed:?} are dirty for control {index}"
        );
        let opposed_value = control.offset.get(opposed);
        self.stats.slot_recomputes += 1;

        let computed = if kind.is_local() {
            self.inverse_solve_constraints_of(index, opposed_value, kind.make_global(), None)
        } else {
            self.solve_constraints_of(index, kind, Some(opposed_value), None)
        };

        if let Some(control) = self.control_element_mut(index) {
            control.offset.set(kind, computed);
        }
        computed
    }

    pub fn set_control_offset_transform(
        &mut self,
        index: usize,
        transform: Transform,
        kind: TransformKind,
        affect_children: bool,
        setup_undo: bool,
        force: bool,
    ) {
        let Some(control) = self.control_element(index) else {
            return;
        };
        if !force
            && !control.offset.is_dirty(kind)
            && control
                .offset
                .get(kind)
                .equals(&transform, TRANSFORM_EQUALS_TOLERANCE)
        {
            return;
        }

        let previous = self.get_control_offset_transform(index, kind);
        let pose_local = kind.make_local();
        self.get_transform(index, pose_local);
        self.get_control_gizmo_transform(index, pose_local);
        self.propagate_dirty_flags(index, kind.is_initial(), affect_children);

        let Some(element) = self.transform_element_mut(index) else {
            return;
        };
        element.pose.mark_dirty(kind.make_global());
        if let Some(control) = element.control.as_mut() {
            control.offset.set(kind, transform);
            control.offset.mark_dirty(kind.swap_local_and_global());
            control.gizmo.mark_dirty(kind.make_global());
        }

        if kind.is_initial() {
            self.set_control_offset_transform(
                index,
                transform,
                kind.make_current(),
                affect_children,
                false,
                force,
            );
        }

        if setup_undo {
            self.push_transform_to_stack(
                index,
                TransformStackEntryType::ControlOffset,
                kind,
                TransformStackValue::Transform(previous),
                TransformStackValue::Transform(transform),
                affect_children,
            );
        }

        self.broadcast(index, Some(kind), |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_control_offset_transform(
                    target,
                    transform,
                    kind,
                    affect_children,
                    false,
                    force,
                );
            }
        });
    }

    /// Gizmo of a control, relative to the control's global pose.
    pub fn get_control_gizmo_transform(&mut self, index: usize, kind: TransformKind) -> Transform {
        let Some(control) = self.control_element(index) else {
            return Transform::IDENTITY;
        };
        if !control.gizmo.is_dirty(kind) {
            return control.gizmo.get(kind);
        }

        let opposed = kind.swap_local_and_global();
        debug_assert!(
            !control.gizmo.is_dirty(opposed),
            "both gizmo {kind:?} and {opposed:?} are dirty for control {index}"
        );
        let opposed_value = control.gizmo.get(opposed);
        self.stats.slot_recomputes += 1;

        let pose = self.get_transform(index, kind.make_global());
        let computed = if kind.is_local() {
            opposed_value.relative_to(&pose)
        } else {
            opposed_value * pose
        }
        .with_normalized_rotation();

        if let Some(control) = self.control_element_mut(index) {
            control.gizmo.set(kind, computed);
        }
        computed
    }

    /// Gizmo writes never propagate, nothing downstream reads the gizmo.
    pub fn set_control_gizmo_transform(
        &mut self,
        index: usize,
        transform: Transform,
        kind: TransformKind,
        setup_undo: bool,
        force: bool,
    ) {
        let Some(control) = self.control_element(index) else {
            return;
        };
        if !force
            && !control.gizmo.is_dirty(kind)
            && control
                .gizmo
                .get(kind)
                .equals(&transform, TRANSFORM_EQUALS_TOLERANCE)
        {
            return;
        }

        let previous = self.get_control_gizmo_transform(index, kind);
        let Some(control) = self.control_element_mut(index) else {
            return;
        };
        control.gizmo.set(kind, transform);
        control.gizmo.mark_dirty(kind.swap_local_and_global());

        if kind.is_initial() {
            self.set_control_gizmo_transform(index, transform, kind.make_current(), false, force);
        }

        if setup_undo {
            self.push_transform_to_stack(
                index,
                TransformStackEntryType::ControlGizmo,
                kind,
                TransformStackValue::Transform(previous),
                TransformStackValue::Transform(transform),
                false,
            );
        }

        self.broadcast(index, Some(kind), |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_control_gizmo_transform(target, transform, kind, false, force);
            }
        });
    }

    /// Local pose of a control that would place it at `global`, given its offset.
    pub(crate) fn compute_local_control_value(
        &mut self,
        index: usize,
        global: Transform,
        kind: TransformKind,
    ) -> Transform {
        let global_kind = kind.make_global();
        let offset = self.get_control_offset_transform(index, global_kind.make_local());
        self.inverse_solve_constraints_of(index, global, global_kind, Some(offset))
    }
}
