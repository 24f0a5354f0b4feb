mod controls;
mod dirty;
mod element;
mod listeners;
mod pose;
mod solver;
mod stack;
mod store;
mod transforms;
mod weights;

pub use element::{Element, ParentConstraint};
pub use listeners::*;
pub use stack::{
    DEFAULT_UNDO_CAPACITY, TransformStackEntry, TransformStackEntryType, TransformStackValue,
};
pub use store::*;
pub use weights::WORLD_SPACE_SOCKET_NAME;

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod solver_tests;




#[cfg(test)]
mod pose_tests;




#[cfg(test)]
mod round_trip_props;
