//! Whole-pose operations: batch evaluation, reset, copy, snapshots and curves.

use super::element::ElementBody;
use super::stack::{TransformStackEntryType, TransformStackValue};
use super::store::RigHierarchy;
use crate::{
    ElementKey, ElementTypeFilter, Error, POSE_FORMAT_VERSION, RigPose, RigPoseElement,
    SMALL_NUMBER, TransformKind,
};

/// Which elements need the slow reset path for a given filter, per topology version.
#[derive(Clone, Debug)]
pub(crate) struct ResetPoseFilterCache {
    topology_version: u32,
    filter: ElementTypeFilter,
    has_unfiltered_children: Vec<bool>,
}

impl RigHierarchy {
    /// Resolves every cached slot (pose, offset, gizmo and parent space) of every element.
    pub fn compute_all_transforms(&mut self) {
        for index in 0..self.elements.len() {
            if !self.elements[index].is_transform_bearing() {
                continue;
            }
            for kind in TransformKind::ALL {
                self.get_transform(index, kind);
                self.get_control_offset_transform(index, kind);
                self.get_control_gizmo_transform(index, kind);
                if self.multi_parent(index).is_some() && kind.is_global() {
                    self.get_parent_transform(index, kind);
                }
            }
        }
    }

    /// Copies the initial pose into the current pose for every element matching `filter`.
    ///
    /// Elements with children outside the filter are reset through [`Self::set_transform`]
    /// so that those children keep their global transforms.
    pub fn reset_pose_to_initial(&mut self, filter: ElementTypeFilter) {
        let has_unfiltered_children = self.has_unfiltered_children(filter);
        for index in 0..self.elements.len() {
            let element = &self.elements[index];
            if !element.is_transform_bearing() || !filter.contains(element.element_type()) {
                continue;
            }

            let initial_offset = self.get_control_offset_transform(index, TransformKind::InitialLocal);
            let initial_gizmo = self.get_control_gizmo_transform(index, TransformKind::InitialLocal);
            let initial_local = self.get_transform(index, TransformKind::InitialLocal);
            let is_control = self.is_control(index);

            if has_unfiltered_children[index] {
                if is_control {
                    self.set_control_offset_transform(
                        index,
                        initial_offset,
                        TransformKind::CurrentLocal,
                        false,
                        false,
                        false,
                    );
                    self.set_control_gizmo_transform(
                        index,
                        initial_gizmo,
                        TransformKind::CurrentLocal,
                        false,
                        false,
                    );
                }
                self.set_transform(
                    index,
                    initial_local,
                    TransformKind::CurrentLocal,
                    false,
                    false,
                    false,
                );
                continue;
            }

            let Some(element) = self.transform_element_mut(index) else {
                continue;
            };
            element.pose.set(TransformKind::CurrentLocal, initial_local);
            element.pose.mark_dirty(TransformKind::CurrentGlobal);
            if let Some(multi) = element.multi_parent_mut() {
                multi.parent_cache.mark_dirty(TransformKind::CurrentGlobal);
            }
            if let Some(control) = element.control.as_mut() {
                control.offset.set(TransformKind::CurrentLocal, initial_offset);
                control.offset.mark_dirty(TransformKind::CurrentGlobal);
                control.gizmo.set(TransformKind::CurrentLocal, initial_gizmo);
                control.gizmo.mark_dirty(TransformKind::CurrentGlobal);
            }
        }
    }

    fn has_unfiltered_children(&mut self, filter: ElementTypeFilter) -> Vec<bool> {
        if filter.is_all() {
            return vec![false; self.elements.len()];
        }
        if let Some(cache) = &self.reset_pose_filter_cache {
            if cache.topology_version == self.topology_version && cache.filter == filter {
                return cache.has_unfiltered_children.clone();
            }
        }

        self.refresh_cached_children();
        let flags: Vec<bool> = self
            .elements
            .iter()
            .map(|element| {
                element
                    .children
                    .iter()
                    .any(|&child| !filter.contains(self.elements[child].element_type()))
            })
            .collect();
        log::debug!(
            "rig hierarchy {}: reset filter {:#08b} needs the slow path for {} elements",
            self.id,
            filter.bits(),
            flags.iter().filter(|&&f| f).count()
        );
        self.reset_pose_filter_cache = Some(ResetPoseFilterCache {
            topology_version: self.topology_version,
            filter,
            has_unfiltered_children: flags.clone(),
        });
        flags
    }

    /// Copies cached slots (values and dirty flags) from the elements of `other` with the
    /// same keys. Curve values count as current.
    pub fn copy_pose(&mut self, other: &RigHierarchy, current: bool, initial: bool) {
        let kinds: Vec<TransformKind> = TransformKind::ALL
            .into_iter()
            .filter(|kind| (kind.is_current() && current) || (kind.is_initial() && initial))
            .collect();

        for element in &mut self.elements {
            let Some(source) = other.find(&element.key) else {
                continue;
            };
            match (&mut element.body, &source.body) {
                (ElementBody::Curve { value }, ElementBody::Curve { value: source_value }) => {
                    if current {
                        *value = *source_value;
                    }
                }
                (ElementBody::Transform(target), ElementBody::Transform(source)) => {
                    for &kind in &kinds {
                        target.pose.set_slot(kind, source.pose.slot(kind));
                        if let (Some(target), Some(source)) =
                            (target.control.as_mut(), source.control.as_ref())
                        {
                            target.offset.set_slot(kind, source.offset.slot(kind));
                            target.gizmo.set_slot(kind, source.gizmo.slot(kind));
                        }
                        if let Some(multi) = target.multi_parent_mut() {
                            multi.parent_cache.mark_dirty(kind);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Order-independent hash of element keys and parent links, used to check whether a
    /// pose snapshot fits this hierarchy.
    pub fn topology_hash(&self) -> u64 {
        self.elements.iter().fold(0u64, |acc, element| {
            let mut hash = fnv1a(FNV_OFFSET, element.key.name.as_bytes());
            hash = fnv1a(hash, element.key.element_type.as_str().as_bytes());
            if let Some(link) = element.parent_link() {
                for parent in link.parent_indices() {
                    if let Some(parent) = self.elements.get(parent) {
                        hash = fnv1a(hash, b"/");
                        hash = fnv1a(hash, parent.key.name.as_bytes());
                        hash = fnv1a(hash, parent.key.element_type.as_str().as_bytes());
                    }
                }
            }
            acc.wrapping_add(hash)
        })
    }

    /// Snapshot of the initial or current pose for elements matching `filter`, restricted
    /// to `items` unless it is empty.
    pub fn get_pose(&mut self, initial: bool, filter: ElementTypeFilter, items: &[ElementKey]) -> RigPose {
        let local_kind = TransformKind::local(initial);
        let global_kind = TransformKind::global(initial);
        let mut elements = Vec::new();
        for index in 0..self.elements.len() {
            let key = self.elements[index].key.clone();
            if !filter.contains(key.element_type) || (!items.is_empty() && !items.contains(&key)) {
                continue;
            }
            let curve_value = match self.elements[index].body {
                ElementBody::Curve { value } => value,
                ElementBody::Transform(_) => 0.0,
            };
            elements.push(RigPoseElement {
                key,
                local: self.get_transform(index, local_kind),
                global: self.get_transform(index, global_kind),
                curve_value,
            });
        }

        RigPose {
            format_version: POSE_FORMAT_VERSION,
            topology_version: self.topology_version,
            topology_hash: self.topology_hash(),
            elements,
        }
    }

    /// Applies a snapshot by key, blending towards it by `weight` (clamped to `[0, 1]`).
    /// Keys missing from this hierarchy are skipped.
    pub fn set_pose(
        &mut self,
        pose: &RigPose,
        kind: TransformKind,
        filter: ElementTypeFilter,
        items: &[ElementKey],
        weight: f32,
    ) {
        let weight = weight.clamp(0.0, 1.0);
        if weight <= SMALL_NUMBER {
            return;
        }

        for entry in &pose.elements {
            if !filter.contains(entry.key.element_type)
                || (!items.is_empty() && !items.contains(&entry.key))
            {
                continue;
            }
            let Some(index) = self.get_index(&entry.key) else {
                log::debug!(
                    "rig hierarchy {}: pose element {} not found, skipped",
                    self.id,
                    entry.key
                );
                continue;
            };

            if self.elements[index].is_transform_bearing() {
                let target = if kind.is_local() {
                    entry.local
                } else {
                    entry.global
                };
                let value = if weight < 1.0 {
                    self.get_transform(index, kind).lerp(&target, weight)
                } else {
                    target
                };
                self.set_transform(index, value, kind, true, false, false);
            } else if kind.is_current() {
                let current = self.get_curve_value(index);
                let value = current + (entry.curve_value - current) * weight;
                self.set_curve_value(index, value, false, false);
            }
        }
    }

    /// [`Self::set_pose`] for a whole snapshot, refusing snapshots of a different format
    /// or topology.
    pub fn set_pose_checked(&mut self, pose: &RigPose, kind: TransformKind, weight: f32) -> Result<(), Error> {
        if pose.format_version != POSE_FORMAT_VERSION {
            return Err(Error::UnsupportedPoseVersion {
                found: pose.format_version,
                expected: POSE_FORMAT_VERSION,
            });
        }
        let hierarchy = self.topology_hash();
        if pose.topology_hash != hierarchy {
            return Err(Error::IncompatiblePose {
                pose: pose.topology_hash,
                hierarchy,
            });
        }
        log::debug!(
            "rig hierarchy {}: applying pose with {} elements",
            self.id,
            pose.elements.len()
        );
        self.set_pose(pose, kind, ElementTypeFilter::ALL, &[], weight);
        Ok(())
    }

    /// Zero for anything that is not a curve.
    pub fn get_curve_value(&self, index: usize) -> f32 {
        match self.elements.get(index).map(|e| &e.body) {
            Some(ElementBody::Curve { value }) => *value,
            _ => 0.0,
        }
    }

    pub fn set_curve_value(&mut self, index: usize, value: f32, setup_undo: bool, force: bool) {
        let Some(element) = self.elements.get_mut(index) else {
            return;
        };
        let ElementBody::Curve { value: stored } = &mut element.body else {
            return;
        };
        let previous = *stored;
        if !force && (previous - value).abs() <= SMALL_NUMBER {
            return;
        }
        *stored = value;

        if setup_undo {
            self.push_transform_to_stack(
                index,
                TransformStackEntryType::Curve,
                TransformKind::CurrentLocal,
                TransformStackValue::Curve(previous),
                TransformStackValue::Curve(value),
                false,
            );
        }

        self.broadcast(index, None, |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_curve_value(target, value, false, force);
            }
        });
    }

    pub fn reset_curve_values(&mut self) {
        for element in &mut self.elements {
            if let ElementBody::Curve { value } = &mut element.body {
                *value = 0.0;
            }
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}
