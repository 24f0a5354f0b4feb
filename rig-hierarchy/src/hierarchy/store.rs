use std::collections::HashMap;

use super::element::{
    ControlElement, Element, ElementBody, MultiParent, ParentConstraint, ParentLink, PoseCache,
    TransformElement,
};
use super::listeners::HierarchyListener;
use super::pose::ResetPoseFilterCache;
use super::stack::TransformStack;
use crate::{
    ControlSettings, ControlValue, ElementKey, ElementType, ElementTypeFilter, ElementWeight,
    Error, Space, Transform, TransformKind,
};

/// Counters used to observe how much work reads actually do.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EvaluationStats {
    /// Transform slots (pose, offset or gizmo) recomputed on a cache miss.
    pub slot_recomputes: u64,
    /// Calls into the parent-constraint solver.
    pub solver_invocations: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TraverseDirection {
    TowardsChildren,
    TowardsParents,
}

/// Arena of rig elements with lazily evaluated local/global transforms.
///
/// Elements are addressed by dense index. Every accessor tolerates indices that do not
/// resolve to a suitable element and answers with identity, zero or `false`.
#[derive(Debug)]
pub struct RigHierarchy {
    pub(crate) id: u32,
    pub(crate) elements: Vec<Element>,
    pub(crate) elements_per_type: [Vec<usize>; 6],
    pub(crate) index_lookup: HashMap<ElementKey, usize>,
    pub(crate) topology_version: u32,
    pub(crate) dirty_propagation_enabled: bool,
    pub(crate) reset_pose_filter_cache: Option<ResetPoseFilterCache>,
    pub(crate) transform_stack: TransformStack,
    pub(crate) listeners: Vec<HierarchyListener>,
    pub(crate) propagating_change: bool,
    pub(crate) force_propagation: bool,
    pub(crate) stats: EvaluationStats,
}

impl Default for RigHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl RigHierarchy {
    pub fn new() -> Self {
        Self {
            id: crate::ids::next_hierarchy_id(),
            elements: Vec::new(),
            elements_per_type: Default::default(),
            index_lookup: HashMap::new(),
            topology_version: 0,
            dirty_propagation_enabled: true,
            reset_pose_filter_cache: None,
            transform_stack: TransformStack::default(),
            listeners: Vec::new(),
            propagating_change: false,
            force_propagation: false,
            stats: EvaluationStats::default(),
        }
    }

    /// Process-unique id of this hierarchy.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn topology_version(&self) -> u32 {
        self.topology_version
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EvaluationStats::default();
    }

    /// Removes every element (last index first) and rewinds the topology version.
    /// Listeners stay registered.
    pub fn reset(&mut self) {
        while let Some(element) = self.elements.pop() {
            log::trace!("rig hierarchy {}: destroying {}", self.id, element.key);
        }
        for bucket in &mut self.elements_per_type {
            bucket.clear();
        }
        self.index_lookup.clear();
        self.topology_version = 0;
        self.reset_pose_filter_cache = None;
        self.transform_stack.clear();
    }

    pub fn num(&self) -> usize {
        self.elements.len()
    }

    pub fn num_of_type(&self, element_type: ElementType) -> usize {
        self.elements_per_type[element_type.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn find(&self, key: &ElementKey) -> Option<&Element> {
        self.get_index(key).and_then(|index| self.elements.get(index))
    }

    pub fn get_index(&self, key: &ElementKey) -> Option<usize> {
        self.index_lookup.get(key).copied()
    }

    pub fn get_index_by_name(&self, name: &str, element_type: ElementType) -> Option<usize> {
        self.get_index(&ElementKey::new(name, element_type))
    }

    /// Element of the given type at its position within that type.
    pub fn get_by_type(&self, element_type: ElementType, sub_index: usize) -> Option<&Element> {
        self.elements_per_type[element_type.index()]
            .get(sub_index)
            .and_then(|&index| self.elements.get(index))
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Keys of all elements matching `filter`, in index order or, with `traverse`,
    /// depth first from each root towards its children.
    pub fn get_all_keys(&mut self, traverse: bool, filter: ElementTypeFilter) -> Vec<ElementKey> {
        if !traverse {
            return self
                .elements
                .iter()
                .filter(|e| filter.contains(e.element_type()))
                .map(|e| e.key.clone())
                .collect();
        }

        self.refresh_cached_children();
        let mut visited = vec![false; self.elements.len()];
        let mut keys = Vec::new();
        let roots: Vec<usize> = self
            .elements
            .iter()
            .filter(|e| e.parent_link().is_none_or(|link| link.first_parent().is_none()))
            .map(|e| e.index)
            .collect();
        for root in roots {
            self.traverse_from(root, TraverseDirection::TowardsChildren, &mut |element| {
                if visited[element.index] {
                    return false;
                }
                visited[element.index] = true;
                if filter.contains(element.element_type()) {
                    keys.push(element.key.clone());
                }
                true
            });
        }
        keys
    }

    /// Depth-first walk from `root`. Returning `false` from `visitor` prunes the branch
    /// below the visited element.
    pub fn traverse<F>(&mut self, root: usize, direction: TraverseDirection, mut visitor: F)
    where
        F: FnMut(&Element) -> bool,
    {
        self.refresh_cached_children();
        self.traverse_from(root, direction, &mut visitor);
    }

    /// Walks from every root element (towards children) or every leaf (towards parents).
    pub fn traverse_all<F>(&mut self, direction: TraverseDirection, mut visitor: F)
    where
        F: FnMut(&Element) -> bool,
    {
        self.refresh_cached_children();
        let starts: Vec<usize> = self
            .elements
            .iter()
            .filter(|e| match direction {
                TraverseDirection::TowardsChildren => {
                    e.parent_link().is_none_or(|link| link.first_parent().is_none())
                }
                TraverseDirection::TowardsParents => e.children.is_empty(),
            })
            .map(|e| e.index)
            .collect();
        for start in starts {
            self.traverse_from(start, direction, &mut visitor);
        }
    }

    fn traverse_from<F>(&self, index: usize, direction: TraverseDirection, visitor: &mut F)
    where
        F: FnMut(&Element) -> bool,
    {
        let Some(element) = self.elements.get(index) else {
            return;
        };
        if !visitor(element) {
            return;
        }
        match direction {
            TraverseDirection::TowardsChildren => {
                for &child in &element.children {
                    self.traverse_from(child, direction, visitor);
                }
            }
            TraverseDirection::TowardsParents => {
                if let Some(link) = element.parent_link() {
                    for parent in link.parent_indices() {
                        self.traverse_from(parent, direction, visitor);
                    }
                }
            }
        }
    }

    /// Elements whose parent link references `index`. With `recursive`, all descendants
    /// in depth-first order, each listed once.
    pub fn get_children(&mut self, index: usize, recursive: bool) -> Vec<usize> {
        if !recursive {
            self.update_cached_children(index, false);
            return self.elements.get(index).map(|e| e.children.clone()).unwrap_or_default();
        }

        self.refresh_cached_children();
        let mut result = Vec::new();
        let mut seen = vec![false; self.elements.len()];
        self.collect_children(index, &mut seen, &mut result);
        result
    }

    fn collect_children(&self, index: usize, seen: &mut [bool], result: &mut Vec<usize>) {
        let Some(element) = self.elements.get(index) else {
            return;
        };
        for &child in &element.children {
            if !seen[child] {
                seen[child] = true;
                result.push(child);
                self.collect_children(child, seen, result);
            }
        }
    }

    /// Direct parents in constraint order. With `recursive`, all ancestors, each listed once.
    pub fn get_parents(&self, index: usize, recursive: bool) -> Vec<usize> {
        let direct = self.parent_indices(index);
        if !recursive {
            return direct;
        }

        let mut result = Vec::new();
        let mut pending = direct;
        pending.reverse();
        while let Some(parent) = pending.pop() {
            if result.contains(&parent) {
                continue;
            }
            result.push(parent);
            let mut grand_parents = self.parent_indices(parent);
            grand_parents.reverse();
            pending.extend(grand_parents);
        }
        result
    }

    pub fn get_first_parent(&self, index: usize) -> Option<usize> {
        self.elements
            .get(index)
            .and_then(Element::parent_link)
            .and_then(ParentLink::first_parent)
    }

    pub fn number_of_parents(&self, index: usize) -> usize {
        self.parent_indices(index).len()
    }

    /// Whether `ancestor` is reachable from `child` through parent links.
    pub fn is_parented_to(&self, child: usize, ancestor: usize) -> bool {
        let mut visited = vec![false; self.elements.len()];
        let mut pending = self.parent_indices(child);
        while let Some(parent) = pending.pop() {
            if parent == ancestor {
                return true;
            }
            if visited.get(parent).copied().unwrap_or(true) {
                continue;
            }
            visited[parent] = true;
            pending.extend(self.parent_indices(parent));
        }
        false
    }

    pub(crate) fn parent_indices(&self, index: usize) -> Vec<usize> {
        self.elements
            .get(index)
            .and_then(Element::parent_link)
            .map(ParentLink::parent_indices)
            .unwrap_or_default()
    }

    /// Rebuilds this hierarchy as a structural copy of `other`, caches and topology
    /// version included. Listeners and the undo stack of `self` are kept.
    pub fn copy_hierarchy(&mut self, other: &RigHierarchy) {
        self.elements = other.elements.clone();
        self.elements_per_type = other.elements_per_type.clone();
        self.index_lookup = other.index_lookup.clone();
        self.topology_version = other.topology_version;
        self.reset_pose_filter_cache = None;
        log::debug!(
            "rig hierarchy {}: copied {} elements from hierarchy {}",
            self.id,
            self.elements.len(),
            other.id
        );
    }

    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<usize>,
        transform: Transform,
        space: Space,
    ) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::Bone);
        self.add_transform_element(key, parent, transform, space, None)
    }

    pub fn add_null(
        &mut self,
        name: &str,
        parent: Option<usize>,
        transform: Transform,
        space: Space,
    ) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::Null);
        self.add_transform_element(key, parent, transform, space, None)
    }

    pub fn add_rigid_body(
        &mut self,
        name: &str,
        parent: Option<usize>,
        local: Transform,
    ) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::RigidBody);
        self.add_transform_element(key, parent, local, Space::Local, None)
    }

    pub fn add_socket(
        &mut self,
        name: &str,
        parent: Option<usize>,
        local: Transform,
    ) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::Socket);
        self.add_transform_element(key, parent, local, Space::Local, None)
    }

    /// Adds a control whose initial and current local pose is `value`. `offset` sits
    /// between the parent space and the pose, `gizmo` is relative to the pose.
    pub fn add_control(
        &mut self,
        name: &str,
        parent: Option<usize>,
        settings: ControlSettings,
        value: ControlValue,
        offset: Transform,
        gizmo: Transform,
    ) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::Control);
        let mut local = value.to_transform(settings.primary_axis);
        settings.apply_limits_to_transform(&mut local);
        let control = ControlElement {
            offset: PoseCache::with_space(offset, true),
            gizmo: PoseCache::with_space(gizmo, true),
            settings,
        };
        self.add_transform_element(key, parent, local, Space::Local, Some(control))
    }

    pub fn add_curve(&mut self, name: &str, value: f32) -> Result<usize, Error> {
        let key = ElementKey::new(name, ElementType::Curve);
        self.validate_new_key(&key)?;
        Ok(self.push_element(key, ElementBody::Curve { value }))
    }

    /// Links `child` to one more parent. Single-parent elements accept this only while
    /// they have no parent yet. With `maintain_global` the child's global transforms are
    /// kept and its locals re-derived, otherwise locals are kept and globals follow.
    pub fn add_parent(
        &mut self,
        child: usize,
        parent: usize,
        weight: impl Into<ElementWeight>,
        maintain_global: bool,
    ) -> Result<(), Error> {
        let Some(child_element) = self.elements.get(child) else {
            return Err(Error::InvalidValue {
                message: format!("no element at index {child}"),
            });
        };
        let child_name = child_element.key.name.clone();
        self.validate_parent(&child_name, parent)?;
        let parent_key = self.elements[parent].key.clone();

        let invalid = |message: &str| Error::InvalidParent {
            child: child_name.clone(),
            parent: parent_key.name.clone(),
            message: message.to_string(),
        };
        let Some(transform) = self.elements[child].transform() else {
            return Err(invalid("curves cannot be parented"));
        };
        if child == parent || self.is_parented_to(parent, child) {
            return Err(invalid("the link would create a cycle"));
        }
        match &transform.parent {
            ParentLink::Single(Some(_)) => {
                return Err(Error::SingleParentOccupied {
                    child: child_name.clone(),
                });
            }
            ParentLink::Multi(multi) if multi.index_lookup.contains_key(&parent_key) => {
                return Err(invalid("already a parent"));
            }
            _ => {}
        }

        for initial in [true, false] {
            self.get_transform(child, TransformKind::new(initial, !maintain_global));
            self.get_control_offset_transform(child, TransformKind::local(initial));
            self.get_control_gizmo_transform(child, TransformKind::local(initial));
            if !maintain_global {
                self.propagate_dirty_flags(child, initial, true);
            }
        }

        let weight = weight.into().clamped();
        let Some(transform) = self.transform_element_mut(child) else {
            return Ok(());
        };
        match &mut transform.parent {
            ParentLink::Single(slot) => *slot = Some(parent),
            ParentLink::Multi(multi) => {
                multi
                    .index_lookup
                    .insert(parent_key, multi.constraints.len());
                multi.constraints.push(ParentConstraint::new(parent, weight));
                multi.parent_cache = PoseCache::ALL_DIRTY;
            }
        }
        for initial in [true, false] {
            transform
                .pose
                .mark_dirty(TransformKind::new(initial, maintain_global));
            if let Some(control) = transform.control.as_mut() {
                control.offset.mark_dirty(TransformKind::global(initial));
                control.gizmo.mark_dirty(TransformKind::global(initial));
            }
        }
        self.bump_topology_version();
        Ok(())
    }

    fn add_transform_element(
        &mut self,
        key: ElementKey,
        parent: Option<usize>,
        transform: Transform,
        space: Space,
        control: Option<ControlElement>,
    ) -> Result<usize, Error> {
        self.validate_new_key(&key)?;
        if let Some(parent) = parent {
            self.validate_parent(&key.name, parent)?;
        }

        let pose = PoseCache::with_space(transform, space == Space::Local);
        let mut body = TransformElement::new(key.element_type, pose);
        body.control = control.map(Box::new);
        if let Some(parent) = parent {
            match &mut body.parent {
                ParentLink::Single(slot) => *slot = Some(parent),
                ParentLink::Multi(multi) => {
                    multi.index_lookup.insert(self.elements[parent].key.clone(), 0);
                    multi
                        .constraints
                        .push(ParentConstraint::new(parent, ElementWeight::ONE));
                }
            }
        }
        Ok(self.push_element(key, ElementBody::Transform(body)))
    }

    fn validate_new_key(&self, key: &ElementKey) -> Result<(), Error> {
        if key.name.trim().is_empty() {
            return Err(Error::InvalidName {
                message: "element names cannot be empty".to_string(),
            });
        }
        if self.index_lookup.contains_key(key) {
            return Err(Error::DuplicateElement { key: key.clone() });
        }
        Ok(())
    }

    fn validate_parent(&self, child: &str, parent: usize) -> Result<(), Error> {
        let Some(parent_element) = self.elements.get(parent) else {
            return Err(Error::UnknownParent {
                child: child.to_string(),
                index: parent,
            });
        };
        if !parent_element.is_transform_bearing() {
            return Err(Error::InvalidParent {
                child: child.to_string(),
                parent: parent_element.key.name.clone(),
                message: "only transform-bearing elements can be parents".to_string(),
            });
        }
        Ok(())
    }

    fn push_element(&mut self, key: ElementKey, body: ElementBody) -> usize {
        let index = self.elements.len();
        let bucket = &mut self.elements_per_type[key.element_type.index()];
        let sub_index = bucket.len();
        bucket.push(index);
        self.index_lookup.insert(key.clone(), index);
        log::debug!("rig hierarchy {}: added {} at index {}", self.id, key, index);
        self.elements.push(Element {
            key,
            index,
            sub_index,
            topology_stamp: None,
            children: Vec::new(),
            body,
        });
        self.bump_topology_version();
        index
    }

    pub(crate) fn transform_element(&self, index: usize) -> Option<&TransformElement> {
        self.elements.get(index)?.transform()
    }

    pub(crate) fn transform_element_mut(&mut self, index: usize) -> Option<&mut TransformElement> {
        self.elements.get_mut(index)?.transform_mut()
    }

    pub(crate) fn control_element(&self, index: usize) -> Option<&ControlElement> {
        self.transform_element(index)?.control.as_deref()
    }

    pub(crate) fn control_element_mut(&mut self, index: usize) -> Option<&mut ControlElement> {
        self.transform_element_mut(index)?.control.as_deref_mut()
    }

    pub(crate) fn multi_parent(&self, index: usize) -> Option<&MultiParent> {
        self.transform_element(index)?.multi_parent()
    }

    pub(crate) fn multi_parent_mut(&mut self, index: usize) -> Option<&mut MultiParent> {
        self.transform_element_mut(index)?.multi_parent_mut()
    }

    pub(crate) fn is_control(&self, index: usize) -> bool {
        self.control_element(index).is_some()
    }
}
