//! Pipeline-specific error types.

use crate::pipeline::capability::Capability;
use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Errors that can occur within the pipeline tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Connecting {child:?} under {parent:?} would create a cycle")]
    CyclicConnection { child: NodeId, parent: NodeId },

    #[error("Invalid node reference: {0:?}")]
    InvalidTarget(NodeId),

    #[error("The root node cannot be connected to a parent")]
    RootIsImmutable,

    #[error("Node {child:?} requires capability {capability} which {parent:?} does not provide")]
    CapabilityMismatch {
        capability: Capability,
        child: NodeId,
        parent: NodeId,
    },

    #[error("Capability {capability} is not supported by {node_type}")]
    UnsupportedCapability {
        capability: Capability,
        node_type: String,
    },

    #[error("No data source is bound to the root node")]
    SourceUnavailable,

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Node {0:?} is already executing")]
    NodeBusy(NodeId),

    #[error("Node {node_id:?} error: {message}")]
    Node { node_id: NodeId, message: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PipelineError {
    /// True for the "no data available" class of request failures.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, PipelineError::UnsupportedCapability { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
