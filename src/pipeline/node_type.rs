//! Node types that can be instantiated at runtime.
//!
//! The UI needs two things from here: a list of what can be added under the
//! currently selected node, and a way to build an instance by name (also
//! used when a saved layout is rebuilt). Both go through an explicit
//! `NodeRegistry` built once at start-up and handed to whoever needs it.

use crate::pipeline::capability::CapabilitySet;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::AnyNode;
use crate::pipeline::nodes::{FilterNode, ScaleNode, StatisticsNode};
use crate::pipeline::tree::PipelineTree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Built-in node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Keeps a subset of samples by index.
    Filter,
    /// Linear unit conversion.
    Scale,
    /// Summary statistics of a series.
    Statistics,
}

impl NodeType {
    /// Type name, matching `NodePlugin::type_name` of the created node.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeType::Filter => "Filter",
            NodeType::Scale => "Scale",
            NodeType::Statistics => "Statistics",
        }
    }

    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Filter => "Sample Filter",
            NodeType::Scale => "Linear Scale",
            NodeType::Statistics => "Statistics",
        }
    }

    /// Get all built-in node types.
    pub fn all() -> &'static [NodeType] {
        &[NodeType::Filter, NodeType::Scale, NodeType::Statistics]
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::Filter =>
                "Keeps samples by index.\n\
                 Follows the current selection.\n\
                 Supports invert mode to drop instead of keep.",

            NodeType::Scale =>
                "Applies gain and offset to a series.\n\
                 Use it for unit conversion.",

            NodeType::Statistics =>
                "Computes count, min, max and mean.\n\
                 NaN samples are ignored.",
        }
    }

    pub fn create(&self) -> AnyNode {
        match self {
            NodeType::Filter => AnyNode::filter(FilterNode::new()),
            NodeType::Scale => AnyNode::scale(ScaleNode::default()),
            NodeType::Statistics => AnyNode::statistics(StatisticsNode::new()),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

type Factory = Arc<dyn Fn() -> AnyNode + Send + Sync>;

/// A registered node type: its declared capabilities and how to build it.
#[derive(Clone)]
pub struct NodeTypeEntry {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub inputs: CapabilitySet,
    pub outputs: CapabilitySet,
    factory: Factory,
}

impl NodeTypeEntry {
    /// Build an entry from a factory; capabilities are read off a sample
    /// instance, since they are fixed per type.
    pub fn new(
        display_name: impl Into<String>,
        description: impl Into<String>,
        factory: impl Fn() -> AnyNode + Send + Sync + 'static,
    ) -> Self {
        let sample = factory();
        Self {
            name: sample.type_name().to_string(),
            display_name: display_name.into(),
            description: description.into(),
            inputs: sample.input_spec(),
            outputs: sample.output_spec(),
            factory: Arc::new(factory),
        }
    }

    pub fn create(&self) -> AnyNode {
        (self.factory)()
    }
}

impl From<NodeType> for NodeTypeEntry {
    fn from(node_type: NodeType) -> Self {
        Self::new(node_type.display_name(), node_type.description(), move || {
            node_type.create()
        })
    }
}

impl std::fmt::Debug for NodeTypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTypeEntry")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Registration-ordered catalogue of node types.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    entries: Vec<NodeTypeEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in node type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for &node_type in NodeType::all() {
            registry.register(node_type.into());
        }
        registry
    }

    /// Register a type. A later registration under the same name replaces
    /// the earlier one in place.
    pub fn register(&mut self, entry: NodeTypeEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == entry.name) {
            tracing::warn!("Replacing registered node type '{}'", entry.name);
            *existing = entry;
        } else {
            tracing::debug!("Registered node type '{}'", entry.name);
            self.entries.push(entry);
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodeTypeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeTypeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a node by type name.
    pub fn create(&self, name: &str) -> PipelineResult<AnyNode> {
        self.get(name)
            .map(NodeTypeEntry::create)
            .ok_or_else(|| PipelineError::UnknownNodeType(name.to_string()))
    }

    /// Types that may be connected under `parent` right now: every type when
    /// `parent` is the root, otherwise those whose inputs the parent offers.
    pub fn legal_children(
        &self,
        tree: &PipelineTree,
        parent: NodeId,
    ) -> PipelineResult<Vec<&NodeTypeEntry>> {
        let mut legal = Vec::new();
        for entry in &self.entries {
            if tree.accepts(parent, &entry.inputs)? {
                legal.push(entry);
            }
        }
        Ok(legal)
    }
}
