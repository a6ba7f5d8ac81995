//! External listeners attached to individual nodes.
//!
//! A node keeps weak references to its observers: it notifies them when its
//! status changes but never keeps them alive. Inspector panels, plot views,
//! and the like register here to stay in sync without polling.

use crate::pipeline::id::NodeId;
use std::sync::{Arc, Weak};

/// Something that wants to hear about a node's status changes.
#[cfg_attr(test, mockall::automock)]
pub trait Observer: Send + Sync {
    /// Called once per `status_changed` on the observed node.
    fn update(&self, node: NodeId);
}

/// Deduplicated, registration-ordered list of weak observer references.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Weak<dyn Observer>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Adding the same observer twice is a no-op.
    /// Returns `true` if it was newly added.
    pub fn add(&mut self, observer: &Arc<dyn Observer>) -> bool {
        let weak = Arc::downgrade(observer);
        if self.observers.iter().any(|o| o.ptr_eq(&weak)) {
            return false;
        }
        self.observers.push(weak);
        true
    }

    /// Unregister an observer. Removing an unknown observer is a no-op.
    /// Returns `true` if something was removed.
    pub fn remove(&mut self, observer: &Arc<dyn Observer>) -> bool {
        let weak = Arc::downgrade(observer);
        let before = self.observers.len();
        self.observers.retain(|o| !o.ptr_eq(&weak));
        self.observers.len() != before
    }

    pub fn contains(&self, observer: &Arc<dyn Observer>) -> bool {
        let weak = Arc::downgrade(observer);
        self.observers.iter().any(|o| o.ptr_eq(&weak))
    }

    /// Number of registered observers that are still alive.
    pub fn len(&self) -> usize {
        self.observers.iter().filter(|o| o.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `update(node)` on every live observer in registration order.
    /// Observers that have been dropped are pruned.
    pub fn notify(&mut self, node: NodeId) {
        // Snapshot before calling out; observers may touch the registry's owner.
        let live: Vec<Arc<dyn Observer>> =
            self.observers.iter().filter_map(Weak::upgrade).collect();
        let pruned = self.observers.len() - live.len();
        if pruned > 0 {
            self.observers.retain(|o| o.strong_count() > 0);
            tracing::trace!("Pruned {} dropped observer(s) of {:?}", pruned, node);
        }
        for observer in live {
            observer.update(node);
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.observers.len())
            .finish()
    }
}
