//! The node anchoring a tree to its external data source.

use crate::pipeline::capability::{Capability, CapabilitySet};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::source::DataSource;
use crate::pipeline::value::{DataValue, RequestParams};
use std::sync::{Arc, Weak};

/// Type name reported in `UnsupportedCapability` errors raised by the root.
pub const ROOT_TYPE_NAME: &str = "RootNode";

/// Root of a `PipelineTree`.
///
/// The root holds only a weak reference to its source: whoever opened the
/// source owns it. Its output capabilities are whatever the bound source
/// offers at the moment of the query.
#[derive(Default)]
pub struct RootNode {
    source: Option<Weak<dyn DataSource>>,
}

impl RootNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        ROOT_TYPE_NAME
    }

    /// Bind (or swap) the data source. Returns the previously bound URI, if any.
    pub fn bind_source(&mut self, source: &Arc<dyn DataSource>) -> Option<String> {
        let previous = self.source().map(|s| s.uri());
        self.source = Some(Arc::downgrade(source));
        previous
    }

    pub fn unbind_source(&mut self) {
        self.source = None;
    }

    /// The bound source, if it is still alive.
    pub fn source(&self) -> Option<Arc<dyn DataSource>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    pub fn uri(&self) -> Option<String> {
        self.source().map(|s| s.uri())
    }

    /// Capabilities of the bound source; empty when there is none.
    pub fn output_spec(&self) -> CapabilitySet {
        self.source()
            .map(|s| s.capabilities())
            .unwrap_or_default()
    }

    pub fn request_data(
        &self,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<DataValue> {
        let source = self.source().ok_or(PipelineError::SourceUnavailable)?;
        source
            .request(capability, params)?
            .ok_or_else(|| PipelineError::UnsupportedCapability {
                capability,
                node_type: ROOT_TYPE_NAME.to_string(),
            })
    }
}

impl std::fmt::Debug for RootNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootNode").field("uri", &self.uri()).finish()
    }
}
