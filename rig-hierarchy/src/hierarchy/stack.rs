//! Undo/redo bookkeeping for transform and curve writes.

use std::collections::VecDeque;

use super::store::RigHierarchy;
use crate::{ElementKey, Transform, TransformKind};

/// Undo entries kept before the oldest ones are dropped.
pub const DEFAULT_UNDO_CAPACITY: usize = 512;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransformStackEntryType {
    Pose,
    ControlOffset,
    ControlGizmo,
    Curve,
}

/// Value restored by an undo or redo.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransformStackValue {
    Transform(Transform),
    Curve(f32),
}

impl TransformStackValue {
    pub fn transform(&self) -> Option<Transform> {
        match self {
            Self::Transform(transform) => Some(*transform),
            Self::Curve(_) => None,
        }
    }

    pub fn curve(&self) -> Option<f32> {
        match self {
            Self::Curve(value) => Some(*value),
            Self::Transform(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransformStackEntry {
    pub key: ElementKey,
    pub entry_type: TransformStackEntryType,
    pub transform_kind: TransformKind,
    pub old_value: TransformStackValue,
    pub new_value: TransformStackValue,
    pub affect_children: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct TransformStack {
    undo: VecDeque<TransformStackEntry>,
    redo: Vec<TransformStackEntry>,
    interacting: bool,
    capacity: usize,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            interacting: false,
            capacity: DEFAULT_UNDO_CAPACITY,
        }
    }
}

impl TransformStack {
    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push(&mut self, entry: TransformStackEntry) {
        self.redo.clear();
        if self.interacting {
            if let Some(last) = self.undo.back_mut() {
                if last.key == entry.key
                    && last.entry_type == entry.entry_type
                    && last.transform_kind == entry.transform_kind
                {
                    last.new_value = entry.new_value;
                    return;
                }
            }
        }
        self.undo.push_back(entry);
        self.enforce_capacity();
    }

    fn push_undo(&mut self, entry: TransformStackEntry) {
        self.undo.push_back(entry);
        self.enforce_capacity();
    }

    fn enforce_capacity(&mut self) {
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
    }
}

impl RigHierarchy {
    /// While interacting, consecutive writes to the same slot collapse into one entry.
    pub fn set_interacting(&mut self, interacting: bool) {
        self.transform_stack.interacting = interacting;
    }

    pub fn is_interacting(&self) -> bool {
        self.transform_stack.interacting
    }

    /// Oldest entry first.
    pub fn undo_entries(&self) -> &VecDeque<TransformStackEntry> {
        &self.transform_stack.undo
    }

    pub fn redo_entries(&self) -> &[TransformStackEntry] {
        &self.transform_stack.redo
    }

    pub fn clear_transform_stack(&mut self) {
        self.transform_stack.clear();
    }

    pub fn undo_capacity(&self) -> usize {
        self.transform_stack.capacity
    }

    /// Drops the oldest undo entries beyond `capacity`. Zero disables recording.
    pub fn set_undo_capacity(&mut self, capacity: usize) {
        self.transform_stack.capacity = capacity;
        self.transform_stack.enforce_capacity();
    }

    /// Restores the value recorded before the most recent write. Returns `false` if there
    /// is nothing to undo or the element no longer exists.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.transform_stack.undo.pop_back() else {
            return false;
        };
        let applied = self.apply_transform_from_stack(&entry, true);
        self.transform_stack.redo.push(entry);
        applied
    }

    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.transform_stack.redo.pop() else {
            return false;
        };
        let applied = self.apply_transform_from_stack(&entry, false);
        self.transform_stack.push_undo(entry);
        applied
    }

    pub(crate) fn push_transform_to_stack(
        &mut self,
        index: usize,
        entry_type: TransformStackEntryType,
        transform_kind: TransformKind,
        old_value: TransformStackValue,
        new_value: TransformStackValue,
        affect_children: bool,
    ) {
        let Some(element) = self.elements.get(index) else {
            return;
        };
        self.transform_stack.push(TransformStackEntry {
            key: element.key.clone(),
            entry_type,
            transform_kind,
            old_value,
            new_value,
            affect_children,
        });
    }

    fn apply_transform_from_stack(&mut self, entry: &TransformStackEntry, undo: bool) -> bool {
        let Some(index) = self.get_index(&entry.key) else {
            return false;
        };
        let value = if undo {
            entry.old_value
        } else {
            entry.new_value
        };
        let kind = entry.transform_kind;
        match (entry.entry_type, value) {
            (TransformStackEntryType::Pose, TransformStackValue::Transform(transform)) => {
                self.set_transform(index, transform, kind, entry.affect_children, false, true);
            }
            (TransformStackEntryType::ControlOffset, TransformStackValue::Transform(transform)) => {
                self.set_control_offset_transform(
                    index,
                    transform,
                    kind,
                    entry.affect_children,
                    false,
                    true,
                );
            }
            (TransformStackEntryType::ControlGizmo, TransformStackValue::Transform(transform)) => {
                self.set_control_gizmo_transform(index, transform, kind, false, true);
            }
            (TransformStackEntryType::Curve, TransformStackValue::Curve(curve)) => {
                self.set_curve_value(index, curve, false, true);
            }
            (entry_type, value) => {
                log::warn!(
                    "rig hierarchy {}: {:?} entry for {:?} carries {:?}",
                    self.id,
                    entry_type,
                    entry.key,
                    value
                );
                return false;
            }
        }
        true
    }
}
