//! Node handles.
//!
//! A `NodeId` is the position of a node's slot in `PipelineTree`. Slot 0 is
//! always the root. Slots of removed nodes stay empty, so an id never comes
//! to mean a different node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node owned by a `PipelineTree`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Never refers to a node.
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("NodeId(INVALID)"),
            NodeId(n) => write!(f, "NodeId({})", n),
        }
    }
}

/// Short form for logs and printed trees: `root`, `#3`, `#invalid`.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ROOT => f.write_str("root"),
            Self::INVALID => f.write_str("#invalid"),
            NodeId(n) => write!(f, "#{}", n),
        }
    }
}
