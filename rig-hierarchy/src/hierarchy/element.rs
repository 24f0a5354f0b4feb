use std::collections::HashMap;

use crate::{ControlSettings, ElementKey, ElementType, ElementWeight, Transform, TransformKind};

/// One cached transform plus its staleness flag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ComputedTransform {
    pub(crate) transform: Transform,
    pub(crate) dirty: bool,
}

impl ComputedTransform {
    pub(crate) const DIRTY: Self = Self {
        transform: Transform::IDENTITY,
        dirty: true,
    };
}

/// Local/global x initial/current cache, indexed by [`TransformKind`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct PoseCache {
    slots: [ComputedTransform; 4],
}

impl PoseCache {
    pub(crate) const ALL_DIRTY: Self = Self {
        slots: [ComputedTransform::DIRTY; 4],
    };

    pub(crate) fn with_space(transform: Transform, local: bool) -> Self {
        let mut cache = Self::ALL_DIRTY;
        cache.set(TransformKind::new(true, local), transform);
        cache.set(TransformKind::new(false, local), transform);
        cache
    }

    pub(crate) fn get(&self, kind: TransformKind) -> Transform {
        self.slots[kind.index()].transform
    }

    pub(crate) fn is_dirty(&self, kind: TransformKind) -> bool {
        self.slots[kind.index()].dirty
    }

    pub(crate) fn set(&mut self, kind: TransformKind, transform: Transform) {
        self.slots[kind.index()] = ComputedTransform {
            transform,
            dirty: false,
        };
    }

    pub(crate) fn mark_dirty(&mut self, kind: TransformKind) {
        self.slots[kind.index()].dirty = true;
    }

    pub(crate) fn slot(&self, kind: TransformKind) -> ComputedTransform {
        self.slots[kind.index()]
    }

    pub(crate) fn set_slot(&mut self, kind: TransformKind, slot: ComputedTransform) {
        self.slots[kind.index()] = slot;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParentConstraint {
    pub(crate) parent: usize,
    pub(crate) initial_weight: ElementWeight,
    pub(crate) weight: ElementWeight,
    /// Parent contribution memoized for the duration of one solve.
    pub(crate) cache: ComputedTransform,
}

impl ParentConstraint {
    pub(crate) fn new(parent: usize, weight: ElementWeight) -> Self {
        Self {
            parent,
            initial_weight: weight,
            weight,
            cache: ComputedTransform::DIRTY,
        }
    }

    pub fn parent_index(&self) -> usize {
        self.parent
    }

    pub fn weight(&self, initial: bool) -> ElementWeight {
        if initial {
            self.initial_weight
        } else {
            self.weight
        }
    }

    pub(crate) fn weight_mut(&mut self, initial: bool) -> &mut ElementWeight {
        if initial {
            &mut self.initial_weight
        } else {
            &mut self.weight
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MultiParent {
    pub(crate) constraints: Vec<ParentConstraint>,
    pub(crate) index_lookup: HashMap<ElementKey, usize>,
    /// Blended parent space, only the global slots are used.
    pub(crate) parent_cache: PoseCache,
}

impl MultiParent {
    pub(crate) fn new() -> Self {
        Self {
            constraints: Vec::new(),
            index_lookup: HashMap::new(),
            parent_cache: PoseCache::ALL_DIRTY,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ParentLink {
    Single(Option<usize>),
    Multi(MultiParent),
}

impl ParentLink {
    pub(crate) fn for_type(element_type: ElementType) -> Self {
        if element_type.supports_multiple_parents() {
            Self::Multi(MultiParent::new())
        } else {
            Self::Single(None)
        }
    }

    pub(crate) fn references(&self, parent: usize) -> bool {
        match self {
            Self::Single(p) => *p == Some(parent),
            Self::Multi(multi) => multi.constraints.iter().any(|c| c.parent == parent),
        }
    }

    pub(crate) fn parent_indices(&self) -> Vec<usize> {
        match self {
            Self::Single(p) => p.iter().copied().collect(),
            Self::Multi(multi) => multi.constraints.iter().map(|c| c.parent).collect(),
        }
    }

    pub(crate) fn first_parent(&self) -> Option<usize> {
        match self {
            Self::Single(p) => *p,
            Self::Multi(multi) => multi.constraints.first().map(|c| c.parent),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ControlElement {
    pub(crate) offset: PoseCache,
    pub(crate) gizmo: PoseCache,
    pub(crate) settings: ControlSettings,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct ElementToDirty {
    pub(crate) element: usize,
    pub(crate) hierarchy_distance: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct TransformElement {
    pub(crate) pose: PoseCache,
    pub(crate) parent: ParentLink,
    pub(crate) control: Option<Box<ControlElement>>,
    pub(crate) elements_to_dirty: Vec<ElementToDirty>,
    pub(crate) elements_to_dirty_version: Option<u32>,
}

impl TransformElement {
    pub(crate) fn new(element_type: ElementType, pose: PoseCache) -> Self {
        Self {
            pose,
            parent: ParentLink::for_type(element_type),
            control: None,
            elements_to_dirty: Vec::new(),
            elements_to_dirty_version: None,
        }
    }

    pub(crate) fn multi_parent(&self) -> Option<&MultiParent> {
        match &self.parent {
            ParentLink::Multi(multi) => Some(multi),
            ParentLink::Single(_) => None,
        }
    }

    pub(crate) fn multi_parent_mut(&mut self) -> Option<&mut MultiParent> {
        match &mut self.parent {
            ParentLink::Multi(multi) => Some(multi),
            ParentLink::Single(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ElementBody {
    Transform(TransformElement),
    Curve { value: f32 },
}

/// A node of the rig graph.
#[derive(Clone, Debug)]
pub struct Element {
    pub(crate) key: ElementKey,
    pub(crate) index: usize,
    pub(crate) sub_index: usize,
    /// Topology version the cached `children` list was built for.
    pub(crate) topology_stamp: Option<u32>,
    pub(crate) children: Vec<usize>,
    pub(crate) body: ElementBody,
}

impl Element {
    pub fn key(&self) -> &ElementKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn element_type(&self) -> ElementType {
        self.key.element_type
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sub_index(&self) -> usize {
        self.sub_index
    }

    pub fn is_transform_bearing(&self) -> bool {
        matches!(self.body, ElementBody::Transform(_))
    }

    pub fn is_control(&self) -> bool {
        self.transform().is_some_and(|t| t.control.is_some())
    }

    /// Parent constraints in order, empty for single-parent and curve elements.
    pub fn parent_constraints(&self) -> &[ParentConstraint] {
        self.transform()
            .and_then(TransformElement::multi_parent)
            .map_or(&[][..], |multi| multi.constraints.as_slice())
    }

    pub(crate) fn transform(&self) -> Option<&TransformElement> {
        match &self.body {
            ElementBody::Transform(t) => Some(t),
            ElementBody::Curve { .. } => None,
        }
    }

    pub(crate) fn transform_mut(&mut self) -> Option<&mut TransformElement> {
        match &mut self.body {
            ElementBody::Transform(t) => Some(t),
            ElementBody::Curve { .. } => None,
        }
    }

    pub(crate) fn parent_link(&self) -> Option<&ParentLink> {
        self.transform().map(|t| &t.parent)
    }
}
