use std::fmt;

/// Weight comparisons below this are treated as equal.
pub const WEIGHT_TOLERANCE: f32 = 1e-8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementType {
    Bone,
    Null,
    Control,
    Curve,
    RigidBody,
    Socket,
}

impl ElementType {
    pub const ALL: [ElementType; 6] = [
        Self::Bone,
        Self::Null,
        Self::Control,
        Self::Curve,
        Self::RigidBody,
        Self::Socket,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Bone => 0,
            Self::Null => 1,
            Self::Control => 2,
            Self::Curve => 3,
            Self::RigidBody => 4,
            Self::Socket => 5,
        }
    }

    pub fn is_transform_bearing(self) -> bool {
        !matches!(self, Self::Curve)
    }

    /// Nulls and controls blend any number of weighted parents, the rest take at most one.
    pub fn supports_multiple_parents(self) -> bool {
        matches!(self, Self::Null | Self::Control)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bone => "Bone",
            Self::Null => "Null",
            Self::Control => "Control",
            Self::Curve => "Curve",
            Self::RigidBody => "RigidBody",
            Self::Socket => "Socket",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an element: unique name within its type.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementKey {
    pub name: String,
    #[cfg_attr(feature = "json", serde(rename = "type"))]
    pub element_type: ElementType,
}

impl ElementKey {
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element_type, self.name)
    }
}

/// Bit set over [`ElementType`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementTypeFilter(u8);

impl ElementTypeFilter {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b11_1111);

    pub fn only(element_type: ElementType) -> Self {
        Self(1 << element_type.index())
    }

    pub fn contains(self, element_type: ElementType) -> bool {
        self.0 & (1 << element_type.index()) != 0
    }

    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    pub(crate) fn bits(self) -> u8 {
        self.0
    }
}

impl Default for ElementTypeFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<ElementType> for ElementTypeFilter {
    fn from(value: ElementType) -> Self {
        Self::only(value)
    }
}

impl std::ops::BitOr for ElementTypeFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOr<ElementType> for ElementTypeFilter {
    type Output = Self;

    fn bitor(self, rhs: ElementType) -> Self {
        self | Self::only(rhs)
    }
}

/// One of the four cached representations of an element's transform.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum TransformKind {
    InitialLocal,
    CurrentLocal,
    InitialGlobal,
    CurrentGlobal,
}

impl TransformKind {
    pub const ALL: [TransformKind; 4] = [
        Self::InitialLocal,
        Self::CurrentLocal,
        Self::InitialGlobal,
        Self::CurrentGlobal,
    ];

    pub fn new(initial: bool, local: bool) -> Self {
        match (initial, local) {
            (true, true) => Self::InitialLocal,
            (true, false) => Self::InitialGlobal,
            (false, true) => Self::CurrentLocal,
            (false, false) => Self::CurrentGlobal,
        }
    }

    pub fn local(initial: bool) -> Self {
        Self::new(initial, true)
    }

    pub fn global(initial: bool) -> Self {
        Self::new(initial, false)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::InitialLocal => 0,
            Self::CurrentLocal => 1,
            Self::InitialGlobal => 2,
            Self::CurrentGlobal => 3,
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, Self::InitialLocal | Self::CurrentLocal)
    }

    pub fn is_global(self) -> bool {
        !self.is_local()
    }

    pub fn is_initial(self) -> bool {
        matches!(self, Self::InitialLocal | Self::InitialGlobal)
    }

    pub fn is_current(self) -> bool {
        !self.is_initial()
    }

    pub fn swap_local_and_global(self) -> Self {
        Self::new(self.is_initial(), !self.is_local())
    }

    pub fn swap_current_and_initial(self) -> Self {
        Self::new(!self.is_initial(), self.is_local())
    }

    pub fn make_local(self) -> Self {
        Self::new(self.is_initial(), true)
    }

    pub fn make_global(self) -> Self {
        Self::new(self.is_initial(), false)
    }

    pub fn make_initial(self) -> Self {
        Self::new(true, self.is_local())
    }

    pub fn make_current(self) -> Self {
        Self::new(false, self.is_local())
    }
}

/// Space in which a transform handed to a registration call is expressed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Space {
    #[default]
    Local,
    Global,
}

/// Blend channel of a parent constraint.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Channel {
    Location,
    Rotation,
    Scale,
}

impl Channel {
    pub(crate) const ALL: [Channel; 3] = [Self::Location, Self::Rotation, Self::Scale];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Location => 0,
            Self::Rotation => 1,
            Self::Scale => 2,
        }
    }
}

/// Per-channel weight of one parent constraint.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementWeight {
    pub location: f32,
    pub rotation: f32,
    pub scale: f32,
}

impl Default for ElementWeight {
    fn default() -> Self {
        Self::splat(1.0)
    }
}

impl ElementWeight {
    pub const ZERO: Self = Self::splat(0.0);
    pub const ONE: Self = Self::splat(1.0);

    pub const fn new(location: f32, rotation: f32, scale: f32) -> Self {
        Self {
            location,
            rotation,
            scale,
        }
    }

    pub const fn splat(weight: f32) -> Self {
        Self::new(weight, weight, weight)
    }

    pub(crate) fn channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Location => self.location,
            Channel::Rotation => self.rotation,
            Channel::Scale => self.scale,
        }
    }

    pub fn affects_location(&self) -> bool {
        self.location > 0.0
    }

    pub fn affects_rotation(&self) -> bool {
        self.rotation > 0.0
    }

    pub fn affects_scale(&self) -> bool {
        self.scale > 0.0
    }

    pub fn is_almost_zero(&self) -> bool {
        !self.affects_location() && !self.affects_rotation() && !self.affects_scale()
    }

    /// Negative weights are meaningless for blending and are stored as zero.
    pub fn clamped(self) -> Self {
        Self::new(
            self.location.max(0.0),
            self.rotation.max(0.0),
            self.scale.max(0.0),
        )
    }

    pub fn nearly_equals(&self, other: &ElementWeight) -> bool {
        (self.location - other.location).abs() <= WEIGHT_TOLERANCE
            && (self.rotation - other.rotation).abs() <= WEIGHT_TOLERANCE
            && (self.scale - other.scale).abs() <= WEIGHT_TOLERANCE
    }
}

impl From<f32> for ElementWeight {
    fn from(value: f32) -> Self {
        Self::splat(value)
    }
}
