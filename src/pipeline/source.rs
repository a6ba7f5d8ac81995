//! The external data source a root node is bound to.
//!
//! Real sources (HDF5 readers, CSV loaders, log decoders) live outside the
//! engine; they only have to answer "which capabilities do you offer" and
//! "give me data for this one". `MemorySource` is the in-process
//! implementation used by the headless runner and the tests.

use crate::pipeline::capability::{Capability, CapabilitySet};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::value::{DataValue, RequestParams};

/// An externally owned data source.
#[cfg_attr(test, mockall::automock)]
pub trait DataSource: Send + Sync {
    /// Location the source was opened from.
    fn uri(&self) -> String;

    /// Capabilities this source can answer right now.
    fn capabilities(&self) -> CapabilitySet;

    /// Answer a request. `Ok(None)` means the capability is not offered.
    fn request(
        &self,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<Option<DataValue>>;
}

/// A source serving numeric channels held in memory.
///
/// - `Uri` → the source's URI.
/// - `Series` → one channel, selected by the `index` parameter (default 0).
/// - `Table` → every channel, one row each.
#[derive(Debug, Clone)]
pub struct MemorySource {
    uri: String,
    channels: Vec<Vec<f64>>,
}

impl MemorySource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, samples: Vec<f64>) -> Self {
        self.channels.push(samples);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl DataSource for MemorySource {
    fn uri(&self) -> String {
        self.uri.clone()
    }

    fn capabilities(&self) -> CapabilitySet {
        let mut caps = CapabilitySet::from_slice(&[Capability::Uri]);
        if !self.channels.is_empty() {
            caps.insert(Capability::Series);
            caps.insert(Capability::Table);
        }
        caps
    }

    fn request(
        &self,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<Option<DataValue>> {
        match capability {
            Capability::Uri => Ok(Some(DataValue::Uri(self.uri.clone()))),
            Capability::Series if !self.channels.is_empty() => {
                let index = params.get_index().unwrap_or(0);
                self.channels
                    .get(index)
                    .map(|c| Some(DataValue::Series(c.clone())))
                    .ok_or_else(|| {
                        PipelineError::Source(format!(
                            "channel {} out of range ({} channels in {})",
                            index,
                            self.channels.len(),
                            self.uri
                        ))
                    })
            }
            Capability::Table if !self.channels.is_empty() => {
                Ok(Some(DataValue::Table(self.channels.clone())))
            }
            _ => Ok(None),
        }
    }
}
