//! Mirroring writes into other hierarchies.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::store::RigHierarchy;
use crate::{ElementKey, TransformKind};

/// A hierarchy that can be registered as a listener of another one.
pub type SharedHierarchy = Rc<RefCell<RigHierarchy>>;

/// Which pose a listener mirrors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ListenerFilter {
    pub initial: bool,
    pub current: bool,
}

impl Default for ListenerFilter {
    fn default() -> Self {
        Self {
            initial: true,
            current: true,
        }
    }
}

impl ListenerFilter {
    pub fn reacts_to(&self, kind: TransformKind) -> bool {
        if kind.is_initial() {
            self.initial
        } else {
            self.current
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct HierarchyListener {
    pub(crate) hierarchy: Weak<RefCell<RigHierarchy>>,
    pub(crate) filter: ListenerFilter,
}

impl RigHierarchy {
    pub fn shared(self) -> SharedHierarchy {
        Rc::new(RefCell::new(self))
    }

    /// Mirrors subsequent writes into `listener`, by element key. Registering the same
    /// hierarchy again only updates its filter. Returns `false` if `listener` is this
    /// hierarchy or is currently borrowed.
    pub fn register_listening_hierarchy(
        &mut self,
        listener: &SharedHierarchy,
        filter: ListenerFilter,
    ) -> bool {
        let listener_id = match listener.try_borrow() {
            Ok(hierarchy) => hierarchy.id,
            Err(_) => {
                log::warn!(
                    "rig hierarchy {}: cannot register a listener that is borrowed (possibly itself)",
                    self.id
                );
                return false;
            }
        };
        if listener_id == self.id {
            log::warn!("rig hierarchy {}: refusing to listen to itself", self.id);
            return false;
        }

        let weak = Rc::downgrade(listener);
        if let Some(existing) = self
            .listeners
            .iter_mut()
            .find(|l| l.hierarchy.ptr_eq(&weak))
        {
            existing.filter = filter;
            return true;
        }
        log::debug!(
            "rig hierarchy {}: hierarchy {} is now listening",
            self.id,
            listener_id
        );
        self.listeners.push(HierarchyListener {
            hierarchy: weak,
            filter,
        });
        true
    }

    pub fn unregister_listening_hierarchy(&mut self, listener: &SharedHierarchy) -> bool {
        let weak = Rc::downgrade(listener);
        let before = self.listeners.len();
        self.listeners.retain(|l| !l.hierarchy.ptr_eq(&weak));
        self.listeners.len() != before
    }

    pub fn clear_listening_hierarchies(&mut self) {
        self.listeners.clear();
    }

    /// Listeners that are still alive.
    pub fn num_listening_hierarchies(&self) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.hierarchy.strong_count() > 0)
            .count()
    }

    /// When set, listeners receive every write regardless of their filter.
    pub fn set_force_propagation(&mut self, force: bool) {
        self.force_propagation = force;
    }

    /// Replays a write on every listener that accepts `kind`. `apply` receives the key of
    /// the written element and the listener; it must not record undo entries.
    pub(crate) fn broadcast<F>(&mut self, index: usize, kind: Option<TransformKind>, mut apply: F)
    where
        F: FnMut(&ElementKey, &mut RigHierarchy),
    {
        if self.listeners.is_empty() {
            return;
        }
        let Some(key) = self.elements.get(index).map(|e| e.key.clone()) else {
            return;
        };
        debug_assert!(
            !self.propagating_change,
            "re-entrant change propagation in rig hierarchy {}",
            self.id
        );
        if self.propagating_change {
            log::warn!(
                "rig hierarchy {}: skipped re-entrant propagation of {}",
                self.id,
                key
            );
            return;
        }

        self.propagating_change = true;
        self.listeners.retain(|l| l.hierarchy.strong_count() > 0);
        for listener in &self.listeners {
            if let Some(kind) = kind {
                if !self.force_propagation && !listener.filter.reacts_to(kind) {
                    continue;
                }
            }
            let Some(shared) = listener.hierarchy.upgrade() else {
                continue;
            };
            let Ok(mut target) = shared.try_borrow_mut() else {
                log::warn!(
                    "rig hierarchy {}: listener is busy, {} not mirrored",
                    self.id,
                    key
                );
                continue;
            };
            log::trace!(
                "rig hierarchy {}: mirroring {} into hierarchy {}",
                self.id,
                key,
                target.id
            );
            apply(&key, &mut *target);
        }
        self.propagating_change = false;
    }
}
