//! Lazily evaluated transform hierarchy for character and prop rigs.
//!
//! Elements (bones, nulls, controls, curves, sockets, rigid bodies) live in a
//! [`RigHierarchy`] and cache their local and global transforms for both the initial
//! and the current pose. Reads recompute stale slots on demand, writes invalidate
//! dependents, and elements with several weighted parents are blended per channel.

#![forbid(unsafe_code)]

mod control;
mod error;
mod hierarchy;
mod ids;
mod math;
mod model;
mod snapshot;
mod version;

pub use control::*;
pub use error::*;
pub use hierarchy::*;
pub use math::*;
pub use model::*;
pub use snapshot::*;
pub use version::*;

pub use glam;
