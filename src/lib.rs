//! # vispipe: pipeline tree engine for a data browser
//!
//! A tree of processing nodes rooted at a data source. Each node declares the
//! capabilities it needs from its parent and the ones it offers to its
//! children; the tree only accepts connections whose contracts line up.
//! Children pull data by asking their parent, and change notifications are
//! pushed from the root down through the tree.
//!
//! ## Architecture
//!
//! - **Pipeline**: the tree itself, its nodes, events, observers and layouts
//! - **Config**: runner configuration loaded from TOML
//! - **Communication**: crossbeam channel bridge for observers on another thread
//!
//! ## Configuration
//!
//! Saved layouts default to the platform-appropriate data directory under
//! `dev.vispipe.engine`:
//!
//! - **Linux**: `~/.local/share/dev.vispipe.engine/`
//! - **macOS**: `~/Library/Application Support/dev.vispipe.engine/`
//! - **Windows**: `%APPDATA%\dev.vispipe.engine\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vispipe::pipeline::{
//!     AnyNode, Capability, DataSource, EventKind, MemorySource, PipelineTree,
//!     RequestParams, ScaleNode, StatisticsNode,
//! };
//!
//! let source: Arc<dyn DataSource> =
//!     Arc::new(MemorySource::new("mem://demo").with_channel(vec![1.0, 2.0, 3.0]));
//! let mut tree = PipelineTree::with_source(&source);
//! let scale = tree.add_child(tree.root(), AnyNode::scale(ScaleNode::new(2.0, 0.0)?))?;
//! let stats = tree.add_child(scale, AnyNode::statistics(StatisticsNode::new()))?;
//!
//! tree.propagate(EventKind::DatasourceChanged)?;
//! let value = tree.request_data(stats, Capability::Statistics, &RequestParams::new())?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use config::{AppConfig, SourceConfig};
pub use error::{Result, ResultExt, VisPipeError};
pub use pipeline::{
    AnyNode, Capability, CapabilitySet, DataSource, DataValue, Event, EventKind, NodeId,
    NodeRegistry, Observer, PipelineError, PipelineTree, RequestParams, TreeLayout,
};
