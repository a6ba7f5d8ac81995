//! ScaleNode: linear unit conversion (`y = gain * x + offset`).

use crate::pipeline::capability::Capability;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::{Event, EventKind};
use crate::pipeline::node::{NodeContext, NodePlugin};
use crate::pipeline::value::{DataValue, RequestParams};
use serde::{Deserialize, Serialize};

static INPUTS: &[Capability] = &[Capability::Series];
static OUTPUTS: &[Capability] = &[Capability::Series];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub gain: f64,
    pub offset: f64,
}

impl ScaleParams {
    /// Gain and offset must both be finite.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.gain.is_finite() {
            return Err(PipelineError::InvalidParameter(format!(
                "Scale gain must be finite, got {}",
                self.gain
            )));
        }
        if !self.offset.is_finite() {
            return Err(PipelineError::InvalidParameter(format!(
                "Scale offset must be finite, got {}",
                self.offset
            )));
        }
        Ok(())
    }
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }
}

pub struct ScaleNode {
    params: ScaleParams,
    cache: Option<(RequestParams, Vec<f64>)>,
}

impl ScaleNode {
    pub fn new(gain: f64, offset: f64) -> PipelineResult<Self> {
        let params = ScaleParams { gain, offset };
        params.validate()?;
        Ok(Self {
            params,
            cache: None,
        })
    }

    pub fn params(&self) -> ScaleParams {
        self.params
    }

    /// Change gain/offset. The owner should follow up with a
    /// `ParametersChanged` pass so downstream caches are dropped too.
    /// Non-finite values are rejected and leave the node untouched.
    pub fn set_params(&mut self, params: ScaleParams) -> PipelineResult<()> {
        params.validate()?;
        self.params = params;
        self.cache = None;
        Ok(())
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    fn apply(&self, input: &[f64]) -> Vec<f64> {
        input
            .iter()
            .map(|v| v * self.params.gain + self.params.offset)
            .collect()
    }
}

impl Default for ScaleNode {
    fn default() -> Self {
        Self {
            params: ScaleParams::default(),
            cache: None,
        }
    }
}

impl NodePlugin for ScaleNode {
    fn type_name(&self) -> &str {
        "Scale"
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
        if capability != Capability::Series {
            return Ok(None);
        }
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

    fn handle_downward_event(&mut self, event: &Event, ctx: &mut NodeContext) -> PipelineResult<()> {
        if !matches!(event.kind(), EventKind::Custom(_)) {
            ctx.mark_changed();
        }
        Ok(())
    }

    fn internal_update(&mut self) {
        self.cache = None;
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.params).ok()
    }

    fn restore(&mut self, state: &serde_json::Value) -> PipelineResult<()> {
        let params: ScaleParams = serde_json::from_value(state.clone())
            .map_err(|e| PipelineError::Layout(format!("Invalid Scale state: {}", e)))?;
        self.set_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let node = ScaleNode::new(2.0, 1.0).unwrap();
        assert_eq!(node.apply(&[0.0, 1.0, -1.0]), vec![1.0, 3.0, -1.0]);
    }

    #[test]
    fn test_default_is_identity() {
        let node = ScaleNode::default();
        assert_eq!(node.apply(&[4.5]), vec![4.5]);
    }

    #[test]
    fn test_save_restore() {
        let node = ScaleNode::new(0.5, -3.0).unwrap();
        let mut restored = ScaleNode::default();
        restored.restore(&node.save().unwrap()).unwrap();
        assert_eq!(restored.params(), ScaleParams { gain: 0.5, offset: -3.0 });
    }

    #[test]
    fn test_rejects_non_finite_params() {
        assert!(matches!(
            ScaleNode::new(f64::NAN, 0.0),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert!(ScaleNode::new(1.0, f64::NEG_INFINITY).is_err());

        let mut node = ScaleNode::new(3.0, 1.0).unwrap();
        node.cache = Some((RequestParams::new(), vec![4.0]));
        for bad in [
            ScaleParams { gain: f64::INFINITY, offset: 0.0 },
            ScaleParams { gain: 1.0, offset: f64::NAN },
        ] {
            assert!(matches!(
                node.set_params(bad),
                Err(PipelineError::InvalidParameter(_))
            ));
        }
        assert_eq!(node.params(), ScaleParams { gain: 3.0, offset: 1.0 });
        assert!(node.is_cached());
    }

    #[test]
    fn test_saved_state_always_restores() {
        let mut node = ScaleNode::default();
        let _ = node.set_params(ScaleParams { gain: f64::NAN, offset: 2.0 });
        let state = node.save().unwrap();
        let mut restored = ScaleNode::new(7.0, 7.0).unwrap();
        restored.restore(&state).unwrap();
        assert_eq!(restored.params(), ScaleParams::default());
    }
}
