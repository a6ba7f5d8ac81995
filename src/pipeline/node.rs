//! Node abstraction for the pipeline tree.
//!
//! Two-layer design:
//! - **`NodePlugin` trait**: the behaviour every processing stage implements,
//!   built-in or loaded from a plugin.
//! - **`BuiltinNode` enum**: all built-in stages, dispatched with a `match`.
//!
//! `AnyNode` wraps the root, a built-in, or a plugin so the tree can store
//! them uniformly. Links (parent, children) and observers are not part of a
//! node: they live in the tree's slot for that node.

use crate::pipeline::capability::{Capability, CapabilitySet};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::event::Event;
use crate::pipeline::id::NodeId;
use crate::pipeline::nodes::{FilterNode, ScaleNode, StatisticsNode};
use crate::pipeline::root::RootNode;
use crate::pipeline::tree::PipelineTree;
use crate::pipeline::value::{DataValue, RequestParams};

/// Handed to node hooks while they run.
///
/// Gives a node access to its parent's data and lets it flag that its status
/// changed; the tree then runs `status_changed` for it as soon as the hook
/// returns.
pub struct NodeContext<'a> {
    tree: &'a mut PipelineTree,
    node: NodeId,
    changed: bool,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(tree: &'a mut PipelineTree, node: NodeId) -> Self {
        Self {
            tree,
            node,
            changed: false,
        }
    }

    /// The node this hook runs for.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.tree.parent(self.node)
    }

    /// Pull data from the parent. `None` when the node is detached or no
    /// upstream stage offers `capability`.
    pub fn request_from_parent(
        &mut self,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<Option<DataValue>> {
        match self.parent() {
            Some(parent) => self.tree.try_request_data(parent, capability, params),
            None => Ok(None),
        }
    }

    /// Ask for `status_changed` to run once this hook returns.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub(crate) fn is_changed(&self) -> bool {
        self.changed
    }
}

/// Behaviour of a processing stage.
///
/// Declared capabilities are fixed per node type.
pub trait NodePlugin: Send {
    /// Type name, also the default display name.
    fn type_name(&self) -> &str;

    /// Capabilities this node needs from its parent.
    fn input_spec(&self) -> &'static [Capability];

    /// Capabilities this node can answer.
    fn output_spec(&self) -> &'static [Capability];

    /// Answer a data request. `Ok(None)` means "not offered here".
    fn request_data(
        &mut self,
        _capability: Capability,
        _params: &RequestParams,
        _ctx: &mut NodeContext,
    ) -> PipelineResult<Option<DataValue>> {
        Ok(None)
    }

    /// Called once per downward pass that reaches this node.
    fn handle_downward_event(&mut self, _event: &Event, _ctx: &mut NodeContext) -> PipelineResult<()> {
        Ok(())
    }

    /// Called once per upward pass that reaches this node.
    fn handle_upward_event(&mut self, _event: &Event, _ctx: &mut NodeContext) -> PipelineResult<()> {
        Ok(())
    }

    /// Invalidate cached derived state. Runs at the start of `status_changed`.
    fn internal_update(&mut self) {}

    /// Opaque persisted state, if the node has any.
    fn save(&self) -> Option<serde_json::Value> {
        None
    }

    /// Restore state produced by `save`.
    fn restore(&mut self, _state: &serde_json::Value) -> PipelineResult<()> {
        Ok(())
    }
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Filter(FilterNode),
    Scale(ScaleNode),
    Statistics(StatisticsNode),
}

impl BuiltinNode {
    fn as_plugin(&self) -> &dyn NodePlugin {
        match self {
            BuiltinNode::Filter(n) => n,
            BuiltinNode::Scale(n) => n,
            BuiltinNode::Statistics(n) => n,
        }
    }

    fn as_plugin_mut(&mut self) -> &mut dyn NodePlugin {
        match self {
            BuiltinNode::Filter(n) => n,
            BuiltinNode::Scale(n) => n,
            BuiltinNode::Statistics(n) => n,
        }
    }
}

/// Wrapper holding the root, a built-in node, or a plugin.
pub enum AnyNode {
    Root(RootNode),
    Builtin(BuiltinNode),
    Plugin(Box<dyn NodePlugin>),
}

impl AnyNode {
    pub fn filter(node: FilterNode) -> Self {
        AnyNode::Builtin(BuiltinNode::Filter(node))
    }

    pub fn scale(node: ScaleNode) -> Self {
        AnyNode::Builtin(BuiltinNode::Scale(node))
    }

    pub fn statistics(node: StatisticsNode) -> Self {
        AnyNode::Builtin(BuiltinNode::Statistics(node))
    }

    pub fn plugin(node: impl NodePlugin + 'static) -> Self {
        AnyNode::Plugin(Box::new(node))
    }

    pub fn is_root(&self) -> bool {
        matches!(self, AnyNode::Root(_))
    }

    pub fn as_root(&self) -> Option<&RootNode> {
        match self {
            AnyNode::Root(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_root_mut(&mut self) -> Option<&mut RootNode> {
        match self {
            AnyNode::Root(r) => Some(r),
            _ => None,
        }
    }

    /// The stage behaviour, or `None` for the root.
    pub fn as_plugin(&self) -> Option<&dyn NodePlugin> {
        match self {
            AnyNode::Root(_) => None,
            AnyNode::Builtin(n) => Some(n.as_plugin()),
            AnyNode::Plugin(n) => Some(n.as_ref()),
        }
    }

    pub fn as_plugin_mut(&mut self) -> Option<&mut dyn NodePlugin> {
        match self {
            AnyNode::Root(_) => None,
            AnyNode::Builtin(n) => Some(n.as_plugin_mut()),
            AnyNode::Plugin(n) => Some(n.as_mut()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            AnyNode::Root(r) => r.name(),
            AnyNode::Builtin(n) => n.as_plugin().type_name(),
            AnyNode::Plugin(n) => n.type_name(),
        }
    }

    pub fn input_spec(&self) -> CapabilitySet {
        self.as_plugin()
            .map(|p| CapabilitySet::from_slice(p.input_spec()))
            .unwrap_or_default()
    }

    /// Current output capabilities. Dynamic for the root.
    pub fn output_spec(&self) -> CapabilitySet {
        match self {
            AnyNode::Root(r) => r.output_spec(),
            other => other
                .as_plugin()
                .map(|p| CapabilitySet::from_slice(p.output_spec()))
                .unwrap_or_default(),
        }
    }

    pub fn internal_update(&mut self) {
        if let Some(p) = self.as_plugin_mut() {
            p.internal_update();
        }
    }

    pub fn save(&self) -> Option<serde_json::Value> {
        self.as_plugin().and_then(|p| p.save())
    }

    pub fn restore(&mut self, state: &serde_json::Value) -> PipelineResult<()> {
        match self.as_plugin_mut() {
            Some(p) => p.restore(state),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnyNode").field(&self.type_name()).finish()
    }
}
