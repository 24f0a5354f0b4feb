//! Parent weights and space switching.

use super::element::ParentLink;
use super::store::RigHierarchy;
use crate::{ElementKey, ElementType, ElementWeight, Transform, TransformKind};

/// Name of the root socket used by [`RigHierarchy::switch_to_world_space`].
pub const WORLD_SPACE_SOCKET_NAME: &str = "WorldSpace";

impl RigHierarchy {
    /// Weight of the `parent_index`-th parent. A single-parent element reports full
    /// weight for its parent, anything else reports zero.
    pub fn get_parent_weight(&self, child: usize, parent_index: usize, initial: bool) -> ElementWeight {
        match self.transform_element(child).map(|t| &t.parent) {
            Some(ParentLink::Multi(multi)) => multi
                .constraints
                .get(parent_index)
                .map_or(ElementWeight::ZERO, |c| c.weight(initial)),
            Some(ParentLink::Single(Some(_))) if parent_index == 0 => ElementWeight::ONE,
            _ => ElementWeight::ZERO,
        }
    }

    pub fn get_parent_weight_array(&self, child: usize, initial: bool) -> Vec<ElementWeight> {
        match self.transform_element(child).map(|t| &t.parent) {
            Some(ParentLink::Multi(multi)) => {
                multi.constraints.iter().map(|c| c.weight(initial)).collect()
            }
            Some(ParentLink::Single(Some(_))) => vec![ElementWeight::ONE],
            _ => Vec::new(),
        }
    }

    /// Changes one parent weight. Returns `false` if nothing changed.
    pub fn set_parent_weight(
        &mut self,
        child: usize,
        parent_index: usize,
        weight: impl Into<ElementWeight>,
        initial: bool,
        affect_children: bool,
    ) -> bool {
        let Some(multi) = self.multi_parent(child) else {
            return false;
        };
        let mut weights: Vec<ElementWeight> =
            multi.constraints.iter().map(|c| c.weight(initial)).collect();
        let Some(slot) = weights.get_mut(parent_index) else {
            return false;
        };
        *slot = weight.into();
        self.set_parent_weight_array(child, &weights, initial, affect_children)
    }

    /// Replaces all parent weights at once. `weights` must have one entry per parent.
    ///
    /// With `affect_children` the child keeps its local transform and moves with the new
    /// blend, otherwise it keeps its global transform and its local is re-derived.
    pub fn set_parent_weight_array(
        &mut self,
        child: usize,
        weights: &[ElementWeight],
        initial: bool,
        affect_children: bool,
    ) -> bool {
        let Some(multi) = self.multi_parent(child) else {
            return false;
        };
        if weights.len() != multi.constraints.len() {
            return false;
        }
        let weights: Vec<ElementWeight> = weights.iter().map(|w| w.clamped()).collect();
        if multi
            .constraints
            .iter()
            .zip(&weights)
            .all(|(c, w)| c.weight(initial).nearly_equals(w))
        {
            return false;
        }

        let local = TransformKind::local(initial);
        let global = TransformKind::global(initial);
        let keep = if affect_children { local } else { global };
        self.get_control_offset_transform(child, local);
        self.get_control_gizmo_transform(child, local);
        self.get_transform(child, keep);
        self.propagate_dirty_flags(child, initial, affect_children);

        let Some(element) = self.transform_element_mut(child) else {
            return false;
        };
        element.pose.mark_dirty(keep.swap_local_and_global());
        if let Some(multi) = element.multi_parent_mut() {
            for (constraint, weight) in multi.constraints.iter_mut().zip(&weights) {
                *constraint.weight_mut(initial) = *weight;
            }
            multi.parent_cache.mark_dirty(global);
        }
        if let Some(control) = element.control.as_mut() {
            control.offset.mark_dirty(global);
            control.gizmo.mark_dirty(global);
        }

        self.broadcast(child, Some(local), |key, listener| {
            if let Some(target) = listener.get_index(key) {
                listener.set_parent_weight_array(target, &weights, initial, affect_children);
            }
        });
        true
    }

    /// Gives the `parent_index`-th parent full weight and every other parent none.
    pub fn switch_to_parent_index(
        &mut self,
        child: usize,
        parent_index: usize,
        initial: bool,
        affect_children: bool,
    ) -> bool {
        let Some(multi) = self.multi_parent(child) else {
            return false;
        };
        if parent_index >= multi.constraints.len() {
            return false;
        }
        let mut weights = vec![ElementWeight::ZERO; multi.constraints.len()];
        weights[parent_index] = ElementWeight::ONE;
        self.set_parent_weight_array(child, &weights, initial, affect_children);
        true
    }

    /// Switches `child` to the element `parent`, linking it with zero weight first if it
    /// is not a parent yet.
    pub fn switch_to_parent(
        &mut self,
        child: usize,
        parent: usize,
        initial: bool,
        affect_children: bool,
    ) -> bool {
        let Some(parent_key) = self.elements.get(parent).map(|e| e.key.clone()) else {
            return false;
        };
        let Some(multi) = self.multi_parent(child) else {
            return false;
        };
        let existing = multi.index_lookup.get(&parent_key).copied();
        let parent_index = match existing {
            Some(parent_index) => parent_index,
            None => {
                if let Err(err) = self.add_parent(child, parent, ElementWeight::ZERO, true) {
                    log::warn!("rig hierarchy {}: cannot switch parent: {err}", self.id);
                    return false;
                }
                match self.multi_parent(child) {
                    Some(multi) => multi.constraints.len() - 1,
                    None => return false,
                }
            }
        };
        self.switch_to_parent_index(child, parent_index, initial, affect_children)
    }

    /// Switches back to the first parent.
    pub fn switch_to_default_parent(&mut self, child: usize, initial: bool, affect_children: bool) -> bool {
        self.switch_to_parent_index(child, 0, initial, affect_children)
    }

    /// Switches to the root-level world space socket, creating it on first use.
    pub fn switch_to_world_space(&mut self, child: usize, initial: bool, affect_children: bool) -> bool {
        let Some(world) = self.get_or_add_world_space_socket() else {
            return false;
        };
        self.switch_to_parent(child, world, initial, affect_children)
    }

    pub fn get_or_add_world_space_socket(&mut self) -> Option<usize> {
        let key = ElementKey::new(WORLD_SPACE_SOCKET_NAME, ElementType::Socket);
        if let Some(index) = self.get_index(&key) {
            return Some(index);
        }
        match self.add_socket(WORLD_SPACE_SOCKET_NAME, None, Transform::IDENTITY) {
            Ok(index) => Some(index),
            Err(err) => {
                log::warn!("rig hierarchy {}: cannot add world space socket: {err}", self.id);
                None
            }
        }
    }
}
