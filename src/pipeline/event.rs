//! Change notifications travelling through the tree.
//!
//! An `Event` pairs an immutable payload with a per-pass visited record so
//! that every node handles a given event at most once, however many paths
//! could reach it.

use crate::pipeline::id::NodeId;
use std::collections::HashSet;

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// The root's data source was swapped or reloaded.
    DatasourceChanged,
    /// The user selected a different set of samples.
    SelectionChanged { indices: Vec<usize> },
    /// A node's user-facing parameters were edited.
    ParametersChanged { node: NodeId },
    /// Plugin-defined notification.
    Custom(String),
}

/// An event plus the nodes that already processed it in this pass.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    visited: HashSet<NodeId>,
    /// Visit order, kept for diagnostics and tests.
    trail: Vec<NodeId>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            visited: HashSet::new(),
            trail: Vec::new(),
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Record a visit. Returns `false` if `node` was already visited.
    pub fn visit(&mut self, node: NodeId) -> bool {
        if !self.visited.insert(node) {
            return false;
        }
        self.trail.push(node);
        true
    }

    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }

    /// Nodes in the order they were visited.
    pub fn trail(&self) -> &[NodeId] {
        &self.trail
    }

    pub fn visited_count(&self) -> usize {
        self.trail.len()
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}
