//! StatisticsNode: count/min/max/mean over the parent's series.

use crate::pipeline::capability::Capability;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::{Event, EventKind};
use crate::pipeline::node::{NodeContext, NodePlugin};
use crate::pipeline::value::{DataValue, RequestParams, SeriesStats};

static INPUTS: &[Capability] = &[Capability::Series];
static OUTPUTS: &[Capability] = &[Capability::Statistics];

#[derive(Default)]
pub struct StatisticsNode {
    cache: Option<(RequestParams, SeriesStats)>,
    /// Number of times statistics were recomputed from upstream data.
    computations: u64,
}

impl StatisticsNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }
}

impl NodePlugin for StatisticsNode {
    fn type_name(&self) -> &str {
        "Statistics"
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
        if capability != Capability::Statistics {
            return Ok(None);
        }
        if let Some((cached_params, stats)) = &self.cache {
            if cached_params == params {
                return Ok(Some(DataValue::Statistics(*stats)));
            }
        }
        let Some(upstream) = ctx.request_from_parent(Capability::Series, params)? else {
            return Ok(None);
        };
        let series = upstream.as_series().ok_or_else(|| PipelineError::Node {
            node_id: ctx.node_id(),
            message: "parent answered Series with a non-series value".into(),
        })?;
        self.computations += 1;
        // An all-NaN or empty series has no statistics.
        let Some(stats) = SeriesStats::compute(series) else {
            return Ok(None);
        };
        self.cache = Some((params.clone(), stats));
        Ok(Some(DataValue::Statistics(stats)))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::AnyNode;
    use crate::pipeline::source::{DataSource, MemorySource};
    use crate::pipeline::tree::PipelineTree;
    use std::sync::Arc;

    fn tree_with(samples: Vec<f64>) -> (PipelineTree, Arc<dyn DataSource>) {
        let source: Arc<dyn DataSource> =
            Arc::new(MemorySource::new("mem://stats").with_channel(samples));
        (PipelineTree::with_source(&source), source)
    }

    fn stats_of(tree: &PipelineTree, id: crate::pipeline::NodeId) -> &StatisticsNode {
        match tree.node(id) {
            Some(AnyNode::Builtin(crate::pipeline::node::BuiltinNode::Statistics(s))) => s,
            other => panic!("expected a statistics node, got {:?}", other),
        }
    }

    #[test]
    fn test_computes_and_caches() {
        let (mut tree, _source) = tree_with(vec![2.0, f64::NAN, 4.0, 6.0]);
        let s = tree
            .add_child(tree.root(), AnyNode::statistics(StatisticsNode::new()))
            .unwrap();

        let params = RequestParams::new();
        let first = tree.request_data(s, Capability::Statistics, &params).unwrap();
        let st = first.as_statistics().unwrap();
        assert_eq!(st.count, 3);
        assert_eq!(st.min, 2.0);
        assert_eq!(st.max, 6.0);
        assert_eq!(st.mean, 4.0);

        tree.request_data(s, Capability::Statistics, &params).unwrap();
        assert_eq!(stats_of(&tree, s).computations(), 1);
        assert!(stats_of(&tree, s).is_cached());
    }

    #[test]
    fn test_datasource_change_invalidates_cache() {
        let (mut tree, _source) = tree_with(vec![1.0, 3.0]);
        let s = tree
            .add_child(tree.root(), AnyNode::statistics(StatisticsNode::new()))
            .unwrap();
        let params = RequestParams::new();
        tree.request_data(s, Capability::Statistics, &params).unwrap();

        tree.propagate(EventKind::DatasourceChanged).unwrap();
        assert!(!stats_of(&tree, s).is_cached());

        tree.request_data(s, Capability::Statistics, &params).unwrap();
        assert_eq!(stats_of(&tree, s).computations(), 2);
    }

    #[test]
    fn test_custom_event_keeps_cache() {
        let (mut tree, _source) = tree_with(vec![1.0]);
        let s = tree
            .add_child(tree.root(), AnyNode::statistics(StatisticsNode::new()))
            .unwrap();
        tree.request_data(s, Capability::Statistics, &RequestParams::new())
            .unwrap();
        tree.propagate(EventKind::Custom("redraw".into())).unwrap();
        assert!(stats_of(&tree, s).is_cached());
    }
}
