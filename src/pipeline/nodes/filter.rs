//! FilterNode: sample selection node.
//!
//! Filters a series by sample index. When `selected` is empty, all samples
//! pass through (passthrough mode). Otherwise only samples whose index is in
//! `selected` pass (or is not in, if inverted). The selection follows
//! `SelectionChanged` events travelling down the tree.

use crate::pipeline::capability::Capability;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::{Event, EventKind};
use crate::pipeline::node::{NodeContext, NodePlugin};
use crate::pipeline::value::{DataValue, RequestParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static INPUTS: &[Capability] = &[Capability::Series];
static OUTPUTS: &[Capability] = &[Capability::Series, Capability::Selection];

#[derive(Debug, Default, Serialize, Deserialize)]
struct FilterState {
    #[serde(default)]
    selected: Vec<usize>,
    #[serde(default)]
    invert: bool,
}

/// Filter node: keeps a subset of samples by index.
///
/// By default passes through all data (passthrough mode).
pub struct FilterNode {
    /// Indices allowed to pass through. Empty = passthrough all.
    selected: BTreeSet<usize>,
    /// Invert mode: if true, drop listed indices instead of keeping them.
    invert_mode: bool,
    /// Last filtered series and the request it answered.
    cache: Option<(RequestParams, Vec<f64>)>,
}

impl FilterNode {
    pub fn new() -> Self {
        Self {
            selected: BTreeSet::new(),
            invert_mode: false,
            cache: None,
        }
    }

    pub fn with_selection(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.selected = indices.into_iter().collect();
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert_mode = invert;
        self
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    pub fn invert_mode(&self) -> bool {
        self.invert_mode
    }

    /// Check if in passthrough mode (no filtering).
    pub fn is_passthrough(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    fn keeps(&self, index: usize) -> bool {
        // Pass if: (in_set AND !invert) OR (!in_set AND invert)
        self.selected.contains(&index) != self.invert_mode
    }

    fn apply(&self, input: &[f64]) -> Vec<f64> {
        if self.is_passthrough() {
            return input.to_vec();
        }
        input
            .iter()
            .enumerate()
            .filter(|(i, _)| self.keeps(*i))
            .map(|(_, v)| *v)
            .collect()
    }

    fn filtered_series(
        &mut self,
        params: &RequestParams,
        ctx: &mut NodeContext,
    ) -> PipelineResult<Option<DataValue>> {
        if let Some((cached_params, series)) = &self.cache {
            if cached_params == params {
                return Ok(Some(DataValue::Series(series.clone())));
            }
        }
        let Some(upstream) = ctx.request_from_parent(Capability::Series, params)? else {
            return Ok(None);
        };
        let input = upstream.into_series().ok_or_else(|| PipelineError::Node {
            node_id: ctx.node_id(),
            message: "parent answered Series with a non-series value".into(),
        })?;
        let output = self.apply(&input);
        self.cache = Some((params.clone(), output.clone()));
        Ok(Some(DataValue::Series(output)))
    }
}

impl Default for FilterNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for FilterNode {
    fn type_name(&self) -> &str {
        "Filter"
    }

    fn input_spec(&self) -> &'static [Capability] {
        INPUTS
    }

    fn output_spec(&self) -> &'static [Capability] {
        OUTPUTS
    }

    fn request_data(
        &mut self,
        capability: Capability,
        params: &RequestParams,
        ctx: &mut NodeContext,
    ) -> PipelineResult<Option<DataValue>> {
        match capability {
            Capability::Series => self.filtered_series(params, ctx),
            Capability::Selection => Ok(Some(DataValue::Selection(
                self.selected.iter().copied().collect(),
            ))),
            _ => Ok(None),
        }
    }

    fn handle_downward_event(&mut self, event: &Event, ctx: &mut NodeContext) -> PipelineResult<()> {
        match event.kind() {
            EventKind::SelectionChanged { indices } => {
                self.selected = indices.iter().copied().collect();
                ctx.mark_changed();
            }
            EventKind::DatasourceChanged | EventKind::ParametersChanged { .. } => {
                ctx.mark_changed();
            }
            EventKind::Custom(_) => {}
        }
        Ok(())
    }

    fn internal_update(&mut self) {
        self.cache = None;
    }

    fn save(&self) -> Option<serde_json::Value> {
        let state = FilterState {
            selected: self.selected.iter().copied().collect(),
            invert: self.invert_mode,
        };
        serde_json::to_value(state).ok()
    }

    fn restore(&mut self, state: &serde_json::Value) -> PipelineResult<()> {
        let state: FilterState = serde_json::from_value(state.clone())
            .map_err(|e| PipelineError::Layout(format!("Invalid Filter state: {}", e)))?;
        self.selected = state.selected.into_iter().collect();
        self.invert_mode = state.invert;
        self.cache = None;
        Ok(())
    }
}
