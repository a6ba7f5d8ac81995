//! Saved tree layouts.
//!
//! A layout records the attached nodes in pre-order together with the index
//! of each node's parent and the opaque state returned by `NodePlugin::save`.
//! Rebuilding replays the same `connect` calls in the same order, which
//! reproduces the tree's shape and child order exactly. Detached nodes are
//! not part of a layout.

use crate::error::{Result, VisPipeError};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeRegistry;
use crate::pipeline::tree::PipelineTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Layout file extension
pub const LAYOUT_FILE_EXTENSION: &str = "vplayout";

fn default_layout_version() -> u32 {
    1
}

/// One saved node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    /// Registered type name used to rebuild the node.
    pub type_name: String,
    /// Display name.
    pub name: String,
    /// Index of the parent in `TreeLayout::nodes`; `None` means the root.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Opaque node state.
    #[serde(default)]
    pub state: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeLayout {
    #[serde(default = "default_layout_version")]
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// URI of the source bound when the layout was captured.
    #[serde(default)]
    pub source_uri: Option<String>,
    #[serde(default)]
    pub nodes: Vec<LayoutNode>,
}

impl TreeLayout {
    /// Record every node attached below the root.
    pub fn capture(tree: &PipelineTree) -> Self {
        let root = tree.root();
        let mut index_of: HashMap<NodeId, usize> = HashMap::new();
        let mut nodes = Vec::new();

        for (id, _depth) in tree.walk().into_iter().filter(|(id, _)| *id != root) {
            let parent = tree
                .parent(id)
                .filter(|p| *p != root)
                .and_then(|p| index_of.get(&p).copied());
            index_of.insert(id, nodes.len());
            nodes.push(LayoutNode {
                type_name: tree.type_name(id).unwrap_or_default().to_string(),
                name: tree.name(id).unwrap_or_default().to_string(),
                parent,
                state: tree.node(id).and_then(|n| n.save()),
            });
        }

        Self {
            version: default_layout_version(),
            saved_at: Utc::now(),
            source_uri: tree.root_node().uri(),
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recreate the saved nodes under `tree`'s root. Returns the new ids in
    /// layout order. Nodes created before a failure stay in the tree,
    /// connected as far as the replay got.
    pub fn rebuild(
        &self,
        tree: &mut PipelineTree,
        registry: &NodeRegistry,
    ) -> PipelineResult<Vec<NodeId>> {
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        for (index, saved) in self.nodes.iter().enumerate() {
            let parent = match saved.parent {
                None => tree.root(),
                Some(p) if p < index => ids[p],
                Some(p) => {
                    return Err(PipelineError::Layout(format!(
                        "node {} refers to parent {} which comes after it",
                        index, p
                    )))
                }
            };

            let mut node = registry.create(&saved.type_name)?;
            if let Some(state) = &saved.state {
                node.restore(state)?;
            }
            let id = tree.add_child(parent, node)?;
            tree.set_name(id, saved.name.clone())?;
            ids.push(id);
        }
        tracing::info!("Rebuilt {} node(s) from layout", ids.len());
        Ok(ids)
    }

    /// Load a layout file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            VisPipeError::Serialization(format!("Failed to parse layout {:?}: {}", path, e))
        })
    }

    /// Save layout to disk as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| VisPipeError::Serialization(format!("Failed to serialize layout: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
