//! Cached child lists and dirty-flag propagation.

#[cfg(not(feature = "recursive-dirty-propagation"))]
use std::collections::VecDeque;

use super::element::ElementToDirty;
use super::store::RigHierarchy;
use crate::TransformKind;

impl RigHierarchy {
    /// Disabling lets callers batch many writes. Slots written meanwhile do not invalidate
    /// their dependents.
    pub fn set_dirty_propagation_enabled(&mut self, enabled: bool) {
        self.dirty_propagation_enabled = enabled;
    }

    pub fn is_dirty_propagation_enabled(&self) -> bool {
        self.dirty_propagation_enabled
    }

    pub(crate) fn bump_topology_version(&mut self) {
        self.topology_version = self.topology_version.wrapping_add(1);
        log::trace!(
            "rig hierarchy {}: topology version {}",
            self.id,
            self.topology_version
        );
    }

    /// Rebuilds the cached child list of `index` if it was built for an older topology.
    pub fn update_cached_children(&mut self, index: usize, force: bool) {
        let version = self.topology_version;
        let Some(element) = self.elements.get(index) else {
            return;
        };
        if !force && element.topology_stamp == Some(version) {
            return;
        }

        let children: Vec<usize> = self
            .elements
            .iter()
            .filter(|e| e.parent_link().is_some_and(|link| link.references(index)))
            .map(|e| e.index)
            .collect();
        let element = &mut self.elements[index];
        element.children = children;
        element.topology_stamp = Some(version);
    }

    /// Rebuilds every cached child list in one pass over the store.
    pub fn update_all_cached_children(&mut self) {
        let version = self.topology_version;
        let mut children = vec![Vec::new(); self.elements.len()];
        for element in &self.elements {
            let Some(link) = element.parent_link() else {
                continue;
            };
            for parent in link.parent_indices() {
                if let Some(list) = children.get_mut(parent) {
                    if !list.contains(&element.index) {
                        list.push(element.index);
                    }
                }
            }
        }
        for (element, list) in self.elements.iter_mut().zip(children) {
            element.children = list;
            element.topology_stamp = Some(version);
        }
        log::trace!(
            "rig hierarchy {}: rebuilt child caches for {} elements",
            self.id,
            self.elements.len()
        );
    }

    pub(crate) fn refresh_cached_children(&mut self) {
        let version = self.topology_version;
        if self
            .elements
            .iter()
            .any(|e| e.topology_stamp != Some(version))
        {
            self.update_all_cached_children();
        }
    }

    pub(crate) fn update_elements_to_dirty(&mut self, index: usize) {
        let version = self.topology_version;
        match self.transform_element(index) {
            Some(t) if t.elements_to_dirty_version != Some(version) => {}
            _ => return,
        }

        let elements_to_dirty = self.collect_elements_to_dirty(index);
        if let Some(t) = self.transform_element_mut(index) {
            t.elements_to_dirty = elements_to_dirty;
            t.elements_to_dirty_version = Some(version);
        }
    }

    /// Every transform-bearing descendant with its shortest distance in links.
    #[cfg(not(feature = "recursive-dirty-propagation"))]
    fn collect_elements_to_dirty(&mut self, index: usize) -> Vec<ElementToDirty> {
        self.refresh_cached_children();
        let mut visited = vec![false; self.elements.len()];
        visited[index] = true;
        let mut queue = VecDeque::from([(index, 0u32)]);
        let mut result = Vec::new();
        while let Some((current, distance)) = queue.pop_front() {
            let Some(element) = self.elements.get(current) else {
                continue;
            };
            for &child in &element.children {
                if visited[child] {
                    continue;
                }
                visited[child] = true;
                if self.elements[child].is_transform_bearing() {
                    result.push(ElementToDirty {
                        element: child,
                        hierarchy_distance: distance + 1,
                    });
                }
                queue.push_back((child, distance + 1));
            }
        }
        result
    }

    /// Direct transform-bearing children only. Propagation walks further itself.
    #[cfg(feature = "recursive-dirty-propagation")]
    fn collect_elements_to_dirty(&mut self, index: usize) -> Vec<ElementToDirty> {
        self.update_cached_children(index, false);
        self.elements[index]
            .children
            .iter()
            .filter(|&&child| self.elements[child].is_transform_bearing())
            .map(|&child| ElementToDirty {
                element: child,
                hierarchy_distance: 1,
            })
            .collect()
    }

    /// Invalidates whatever depends on `index` before one of its slots is overwritten.
    ///
    /// With `affect_children` the dependents keep their local transforms and their global
    /// slots go dirty. Without it the direct dependents keep their globals and their
    /// locals go dirty. Dependents first materialize the slot they keep, so they never
    /// re-derive from the post-write state.
    pub(crate) fn propagate_dirty_flags(&mut self, index: usize, initial: bool, affect_children: bool) {
        if !self.dirty_propagation_enabled {
            return;
        }

        let targets = self.dirty_targets(index, affect_children);
        if targets.is_empty() {
            return;
        }

        let local = TransformKind::local(initial);
        let global = TransformKind::global(initial);
        let to_compute = if affect_children { local } else { global };
        let to_dirty = to_compute.swap_local_and_global();

        for &target in &targets {
            if self.is_control(target) {
                self.get_control_offset_transform(target, local);
                self.get_control_gizmo_transform(target, local);
            }
            self.get_transform(target, to_compute);
        }

        for &target in &targets {
            let Some(t) = self.transform_element_mut(target) else {
                continue;
            };
            t.pose.mark_dirty(to_dirty);
            if let Some(multi) = t.multi_parent_mut() {
                multi.parent_cache.mark_dirty(global);
            }
            if let Some(control) = t.control.as_mut() {
                control.offset.mark_dirty(global);
                control.gizmo.mark_dirty(global);
            }
        }

        log::trace!(
            "rig hierarchy {}: element {} dirtied {} dependents ({:?})",
            self.id,
            index,
            targets.len(),
            to_dirty
        );
    }

    #[cfg(not(feature = "recursive-dirty-propagation"))]
    fn dirty_targets(&mut self, index: usize, affect_children: bool) -> Vec<usize> {
        self.update_elements_to_dirty(index);
        let Some(t) = self.transform_element(index) else {
            return Vec::new();
        };
        t.elements_to_dirty
            .iter()
            .filter(|e| affect_children || e.hierarchy_distance <= 1)
            .map(|e| e.element)
            .collect()
    }

    #[cfg(feature = "recursive-dirty-propagation")]
    fn dirty_targets(&mut self, index: usize, affect_children: bool) -> Vec<usize> {
        let mut visited = vec![false; self.elements.len()];
        if let Some(slot) = visited.get_mut(index) {
            *slot = true;
        }
        let mut result = Vec::new();
        let mut pending = vec![index];
        while let Some(current) = pending.pop() {
            self.update_elements_to_dirty(current);
            let Some(t) = self.transform_element(current) else {
                continue;
            };
            let direct: Vec<usize> = t.elements_to_dirty.iter().map(|e| e.element).collect();
            for child in direct.into_iter().rev() {
                if visited[child] {
                    continue;
                }
                visited[child] = true;
                result.push(child);
                if affect_children {
                    pending.push(child);
                }
            }
        }
        result
    }
}
