//! Serialized pose format version.

/// Version written into every [`crate::RigPose`] produced by this crate.
pub const POSE_FORMAT_VERSION: u32 = 1;
