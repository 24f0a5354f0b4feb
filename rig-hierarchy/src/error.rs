use thiserror::Error;

use crate::ElementKey;

#[derive(Debug, Error)]
pub enum Error {
    #[error("element already exists: {key}")]
    DuplicateElement { key: ElementKey },

    #[error("invalid element name: {message}")]
    InvalidName { message: String },

    #[error("unknown parent element index {index} for '{child}'")]
    UnknownParent { child: String, index: usize },

    #[error("element '{parent}' cannot parent '{child}': {message}")]
    InvalidParent {
        child: String,
        parent: String,
        message: String,
    },

    #[error("element '{child}' already has a parent and accepts only one")]
    SingleParentOccupied { child: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[cfg(feature = "json")]
    #[error("failed to parse rig pose JSON: {message}")]
    PoseParse { message: String },

    #[error("unsupported rig pose format version {found} (expected {expected})")]
    UnsupportedPoseVersion { found: u32, expected: u32 },

    #[error("rig pose topology hash {pose:#x} does not match hierarchy hash {hierarchy:#x}")]
    IncompatiblePose { pose: u64, hierarchy: u64 },
}
