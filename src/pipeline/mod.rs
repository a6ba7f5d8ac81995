//! Pipeline tree engine.
//!
//! Data flows down a tree of typed nodes: the root is bound to an external
//! data source, and every other node derives something from its parent.
//! Requests are pulled upward (a node asks its parent, which may ask its own
//! parent, down to the source); change notifications are pushed downward
//! from the root.
//!
//! # Architecture
//!
//! ```text
//! [RootNode: source] ──► [Filter] ──► [Scale] ──► [Statistics]
//!                    └──► [Statistics]
//! ```
//!
//! # Design
//!
//! - **Arena storage**: `PipelineTree` owns every node in a flat `Vec`;
//!   `NodeId` is the index, parent/children are handles.
//! - **Capability contracts**: a child may only connect under a parent whose
//!   outputs cover its inputs; the root accepts anything.
//! - **Enum dispatch**: `BuiltinNode` for built-in stages, `NodePlugin`
//!   trait objects for everything else.
//! - **Single visit**: each event carries a visited set, so a node handles
//!   a given event at most once.
//! - **Weak observers**: nodes notify observers but never own them.

pub mod bridge;
pub mod capability;
pub mod error;
pub mod event;
pub mod id;
pub mod layout;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod observer;
pub mod root;
pub mod source;
pub mod tree;
pub mod value;

pub use bridge::{ChannelObserver, StatusBridge, StatusMessage};
pub use capability::{Capability, CapabilitySet};
pub use error::{PipelineError, PipelineResult};
pub use event::{Event, EventKind};
pub use id::NodeId;
pub use layout::{LayoutNode, TreeLayout};
pub use node::{AnyNode, BuiltinNode, NodeContext, NodePlugin};
pub use node_type::{NodeRegistry, NodeType, NodeTypeEntry};
pub use nodes::{FilterNode, ScaleNode, ScaleParams, StatisticsNode};
pub use observer::{Observer, ObserverRegistry};
pub use root::RootNode;
pub use source::{DataSource, MemorySource};
pub use tree::{PipelineTree, SharedTree};
pub use value::{DataValue, ParamValue, RequestParams, SeriesStats};
