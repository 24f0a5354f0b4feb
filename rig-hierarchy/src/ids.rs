use std::sync::atomic::{AtomicU32, Ordering};

// Process-global, monotonically increasing. Used to tell hierarchies apart when
// wiring up listeners and in log output.
static NEXT_HIERARCHY_ID: AtomicU32 = AtomicU32::new(0);

pub(crate) fn next_hierarchy_id() -> u32 {
    NEXT_HIERARCHY_ID.fetch_add(1, Ordering::Relaxed)
}
