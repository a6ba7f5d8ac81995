//! Event propagation, observers and cache invalidation.

mod common;

use common::builders::{filter, filter_node, scale, statistics, statistics_node, ChainBuilder};
use common::{assert_float_eq, series_source, RecordingObserver};
use std::sync::{Arc, Mutex};
use vispipe::pipeline::{
    AnyNode, Capability, Event, EventKind, NodeContext, NodeId, NodePlugin, Observer,
    PipelineError, PipelineResult, PipelineTree, RequestParams, StatusBridge, StatusMessage,
};

/// Records which nodes saw which event, in the order they saw it.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<(NodeId, &'static str)>>>);

impl Journal {
    fn entries(&self) -> Vec<(NodeId, &'static str)> {
        self.0.lock().unwrap().clone()
    }
}

struct Listener {
    journal: Journal,
    fail_on_down: bool,
}

impl NodePlugin for Listener {
    fn type_name(&self) -> &str {
        "Listener"
    }

    fn input_spec(&self) -> &'static [Capability] {
        &[]
    }

    fn output_spec(&self) -> &'static [Capability] {
        &[Capability::Series]
    }

    fn handle_downward_event(&mut self, _event: &Event, ctx: &mut NodeContext) -> PipelineResult<()> {
        self.journal.0.lock().unwrap().push((ctx.node_id(), "down"));
        if self.fail_on_down {
            return Err(PipelineError::Node {
                node_id: ctx.node_id(),
                message: "listener refused".into(),
            });
        }
        Ok(())
    }

    fn handle_upward_event(&mut self, _event: &Event, ctx: &mut NodeContext) -> PipelineResult<()> {
        self.journal.0.lock().unwrap().push((ctx.node_id(), "up"));
        Ok(())
    }
}

fn listener(journal: &Journal) -> AnyNode {
    AnyNode::plugin(Listener {
        journal: journal.clone(),
        fail_on_down: false,
    })
}

#[test]
fn test_downward_pass_is_preorder_and_single_visit() {
    let journal = Journal::default();
    let mut tree = PipelineTree::new();
    let root = tree.root();
    let a = tree.add_child(root, listener(&journal)).unwrap();
    let b = tree.add_child(a, listener(&journal)).unwrap();
    let c = tree.add_child(a, listener(&journal)).unwrap();
    let d = tree.add_child(root, listener(&journal)).unwrap();

    let event = tree.propagate(EventKind::Custom("tick".into())).unwrap();

    assert_eq!(event.trail(), &[root, a, b, c, d]);
    let handled: Vec<_> = journal.entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(handled, vec![a, b, c, d]);
}

#[test]
fn test_event_reused_across_passes_is_not_redelivered() {
    let journal = Journal::default();
    let mut tree = PipelineTree::new();
    let root = tree.root();
    let a = tree.add_child(root, listener(&journal)).unwrap();
    let b = tree.add_child(a, listener(&journal)).unwrap();

    let mut event = Event::new(EventKind::Custom("once".into()));
    tree.propagate_down(root, &mut event).unwrap();
    tree.propagate_down(a, &mut event).unwrap();
    tree.propagate_up(b, &mut event).unwrap();

    assert_eq!(journal.entries(), vec![(a, "down"), (b, "down")]);
}

#[test]
fn test_upward_pass_walks_parent_chain() {
    let journal = Journal::default();
    let mut tree = PipelineTree::new();
    let root = tree.root();
    let a = tree.add_child(root, listener(&journal)).unwrap();
    let b = tree.add_child(a, listener(&journal)).unwrap();
    let sibling = tree.add_child(root, listener(&journal)).unwrap();

    let mut event = Event::new(EventKind::Custom("bubble".into()));
    tree.propagate_up(b, &mut event).unwrap();

    assert_eq!(journal.entries(), vec![(b, "up"), (a, "up")]);
    assert!(event.is_visited(root));
    assert!(!event.is_visited(sibling));
}

#[test]
fn test_failing_handler_aborts_the_pass() {
    let journal = Journal::default();
    let mut tree = PipelineTree::new();
    let root = tree.root();
    let bad = tree
        .add_child(
            root,
            AnyNode::plugin(Listener {
                journal: journal.clone(),
                fail_on_down: true,
            }),
        )
        .unwrap();
    let _below = tree.add_child(bad, listener(&journal)).unwrap();
    let _after = tree.add_child(root, listener(&journal)).unwrap();

    let err = tree.propagate(EventKind::DatasourceChanged).unwrap_err();
    assert!(matches!(err, PipelineError::Node { node_id, .. } if node_id == bad));
    assert_eq!(journal.entries(), vec![(bad, "down")]);
}

#[test]
fn test_observer_sees_each_status_change_in_order() {
    let (mut tree, ids) = ChainBuilder::new(1).build();
    let n = ids[0];
    let recorder = RecordingObserver::new();
    let observer: Arc<dyn Observer> = recorder.clone();
    tree.add_observer(n, &observer).unwrap();

    for _ in 0..3 {
        tree.status_changed(n).unwrap();
    }
    assert_eq!(recorder.seen(), vec![n, n, n]);
}

#[test]
fn test_observer_registration_is_idempotent_and_weak() {
    let (mut tree, ids) = ChainBuilder::new(1).build();
    let n = ids[0];
    let recorder = RecordingObserver::new();
    let observer: Arc<dyn Observer> = recorder.clone();

    tree.add_observer(n, &observer).unwrap();
    tree.add_observer(n, &observer).unwrap();
    assert_eq!(tree.observer_count(n), 1);
    tree.status_changed(n).unwrap();
    assert_eq!(recorder.seen(), vec![n]);

    tree.remove_observer(n, &observer).unwrap();
    tree.remove_observer(n, &observer).unwrap();
    tree.status_changed(n).unwrap();
    assert_eq!(recorder.seen(), vec![n]);

    tree.add_observer(n, &observer).unwrap();
    drop(observer);
    drop(recorder);
    assert_eq!(tree.observer_count(n), 0);
    tree.status_changed(n).unwrap();
}

#[test]
fn test_datasource_change_notifies_every_attached_node() {
    let source = series_source(&[1.0, 2.0, 3.0]);
    let mut tree = PipelineTree::with_source(&source);
    let root = tree.root();
    let f = tree.add_child(root, filter()).unwrap();
    let s = tree.add_child(f, statistics()).unwrap();
    let detached = tree.add_node(statistics());

    let bridge = StatusBridge::new();
    let observer = bridge.observer();
    for id in [root, f, s, detached] {
        tree.add_observer(id, &observer).unwrap();
    }

    tree.propagate(EventKind::DatasourceChanged).unwrap();
    assert_eq!(
        bridge.drain(),
        vec![StatusMessage::StatusChanged(f), StatusMessage::StatusChanged(s)]
    );
}

#[test]
fn test_caches_are_rebuilt_after_datasource_change() {
    let source = series_source(&[1.0, 2.0, 3.0, 4.0]);
    let mut tree = PipelineTree::with_source(&source);
    let f = tree.add_child(tree.root(), filter()).unwrap();
    let sc = tree.add_child(f, scale(2.0)).unwrap();
    let st = tree.add_child(sc, statistics()).unwrap();
    let params = RequestParams::new();

    let first = tree.request_data(st, Capability::Statistics, &params).unwrap();
    assert_float_eq(first.as_statistics().unwrap().mean, 5.0, 1e-9);
    assert!(filter_node(&tree, f).is_cached());
    assert!(statistics_node(&tree, st).is_cached());

    tree.propagate(EventKind::DatasourceChanged).unwrap();
    assert!(!filter_node(&tree, f).is_cached());
    assert!(!statistics_node(&tree, st).is_cached());

    tree.request_data(st, Capability::Statistics, &params).unwrap();
    assert_eq!(statistics_node(&tree, st).computations(), 2);
}

#[test]
fn test_selection_flows_down_to_filters() {
    let source = series_source(&[10.0, 20.0, 30.0, 40.0]);
    let mut tree = PipelineTree::with_source(&source);
    let f = tree.add_child(tree.root(), filter()).unwrap();
    let st = tree.add_child(f, statistics()).unwrap();

    tree.propagate(EventKind::SelectionChanged { indices: vec![1, 3] })
        .unwrap();

    let selection = tree
        .request_data(f, Capability::Selection, &RequestParams::new())
        .unwrap();
    assert_eq!(selection.as_selection(), Some(&[1usize, 3][..]));

    let stats = tree
        .request_data(st, Capability::Statistics, &RequestParams::new())
        .unwrap();
    assert_float_eq(stats.as_statistics().unwrap().mean, 30.0, 1e-9);
}

#[test]
fn test_requests_through_unbound_root_fail() {
    let mut tree = PipelineTree::new();
    let st = tree.add_child(tree.root(), statistics()).unwrap();
    assert_eq!(
        tree.request_data(st, Capability::Statistics, &RequestParams::new()),
        Err(PipelineError::SourceUnavailable)
    );
}

#[test]
fn test_requests_from_detached_node_yield_nothing() {
    let mut tree = PipelineTree::new();
    let st = tree.add_node(statistics());
    assert_eq!(
        tree.try_request_data(st, Capability::Statistics, &RequestParams::new()),
        Ok(None)
    );
}

#[test]
fn test_reparented_node_drops_results_from_old_parent() {
    let source = series_source(&[1.0, 2.0, 3.0]);
    let mut tree = PipelineTree::with_source(&source);
    let root = tree.root();
    let loud = tree.add_child(root, scale(100.0)).unwrap();
    let unit = tree.add_child(root, scale(1.0)).unwrap();
    let st = tree.add_child(loud, statistics()).unwrap();
    let params = RequestParams::new();

    let before = tree.request_data(st, Capability::Statistics, &params).unwrap();
    assert_float_eq(before.as_statistics().unwrap().max, 300.0, 1e-9);

    let recorder = RecordingObserver::new();
    let observer: Arc<dyn Observer> = recorder.clone();
    tree.add_observer(st, &observer).unwrap();

    tree.connect(st, unit).unwrap();
    assert!(!statistics_node(&tree, st).is_cached());
    assert_eq!(recorder.seen(), vec![st]);

    let after = tree.request_data(st, Capability::Statistics, &params).unwrap();
    assert_float_eq(after.as_statistics().unwrap().max, 3.0, 1e-9);
}

#[test]
fn test_moving_a_subtree_invalidates_every_descendant() {
    let source = series_source(&[2.0, 4.0]);
    let mut tree = PipelineTree::with_source(&source);
    let root = tree.root();
    let f = tree.add_child(root, filter()).unwrap();
    let sc = tree.add_child(f, scale(10.0)).unwrap();
    let st = tree.add_child(sc, statistics()).unwrap();
    let other = tree.add_child(root, filter()).unwrap();
    let params = RequestParams::new();
    tree.request_data(st, Capability::Statistics, &params).unwrap();

    let bridge = StatusBridge::new();
    let observer = bridge.observer();
    for id in [f, sc, st, other] {
        tree.add_observer(id, &observer).unwrap();
    }

    tree.connect(sc, other).unwrap();
    assert!(!statistics_node(&tree, st).is_cached());
    assert!(filter_node(&tree, f).is_cached());
    assert_eq!(
        bridge.drain(),
        vec![StatusMessage::StatusChanged(sc), StatusMessage::StatusChanged(st)]
    );

    tree.request_data(st, Capability::Statistics, &params).unwrap();
    tree.disconnect(sc).unwrap();
    assert!(!statistics_node(&tree, st).is_cached());
    assert_eq!(
        tree.try_request_data(st, Capability::Statistics, &params),
        Ok(None)
    );
}

#[test]
fn test_deep_chain_propagates_without_recursion() {
    const DEPTH: usize = 5_000;
    let (mut tree, ids) = ChainBuilder::new(DEPTH).build();

    let event = tree.propagate(EventKind::Custom("deep".into())).unwrap();

    assert_eq!(event.visited_count(), DEPTH + 1);
    assert_eq!(event.trail().last(), ids.last());
    assert_eq!(&event.trail()[1..], ids.as_slice());
}
