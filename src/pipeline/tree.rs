//! The pipeline tree: node storage, links and event passes.
//!
//! Nodes live in a flat `Vec` of slots indexed by `NodeId`. Each slot holds
//! the node itself plus its links (`parent`, ordered `children`) and its
//! observers. Links are only ever changed by `bind_child`/`unbind_child`, so
//! `b ∈ children(a)` and `parent(b) == a` always change together.
//!
//! ```text
//! RootNode ──► Filter ──► Scale ──► Statistics
//!          └─► Statistics
//! ```
//!
//! The tree is single-threaded: every operation runs to completion on the
//! caller's thread. Hosts that share a tree between threads wrap it in one
//! `Mutex` (see [`SharedTree`]).

use crate::pipeline::capability::{Capability, CapabilitySet};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::event::{Event, EventKind};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{AnyNode, NodeContext};
use crate::pipeline::observer::{Observer, ObserverRegistry};
use crate::pipeline::root::RootNode;
use crate::pipeline::source::DataSource;
use crate::pipeline::value::{DataValue, RequestParams};
use std::sync::{Arc, Mutex};

/// A tree shared between threads; all mutation is serialized by the lock.
pub type SharedTree = Arc<Mutex<PipelineTree>>;

/// Storage for one node and its links.
#[derive(Debug)]
pub struct NodeSlot {
    /// `None` while the node is executing a hook.
    node: Option<AnyNode>,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    observers: ObserverRegistry,
}

impl NodeSlot {
    fn new(node: AnyNode) -> Self {
        Self {
            name: node.type_name().to_string(),
            node: Some(node),
            parent: None,
            children: Vec::new(),
            observers: ObserverRegistry::new(),
        }
    }
}

/// Which local handler a propagation pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Down,
    Up,
}

/// Owner of the root and of every node attached to (or detached from) it.
#[derive(Debug)]
pub struct PipelineTree {
    /// Removed nodes leave `None` behind; ids are never reused.
    slots: Vec<Option<NodeSlot>>,
    root: NodeId,
}

impl Default for PipelineTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTree {
    pub fn new() -> Self {
        Self {
            slots: vec![Some(NodeSlot::new(AnyNode::Root(RootNode::new())))],
            root: NodeId::ROOT,
        }
    }

    /// Create a tree whose root is already bound to `source`.
    pub fn with_source(source: &Arc<dyn DataSource>) -> Self {
        let mut tree = Self::new();
        tree.bind_source(source);
        tree
    }

    pub fn into_shared(self) -> SharedTree {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Slots ──

    fn slot(&self, id: NodeId) -> PipelineResult<&NodeSlot> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(PipelineError::InvalidTarget(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> PipelineResult<&mut NodeSlot> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PipelineError::InvalidTarget(id))
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ids of all live nodes, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    // ── Node management ──

    /// Add an isolated node (no parent, no children). Returns its NodeId.
    pub fn add_node(&mut self, node: AnyNode) -> NodeId {
        debug_assert!(!node.is_root(), "a tree has exactly one root");
        let id = NodeId(self.slots.len() as u32);
        tracing::debug!("Added node {:?} ({})", id, node.type_name());
        self.slots.push(Some(NodeSlot::new(node)));
        id
    }

    /// Add a node and connect it under `parent` in one step. On a failed
    /// connect the node is dropped again and the tree is unchanged.
    pub fn add_child(&mut self, parent: NodeId, node: AnyNode) -> PipelineResult<NodeId> {
        let id = self.add_node(node);
        if let Err(e) = self.connect(id, parent) {
            self.slots.pop();
            return Err(e);
        }
        Ok(id)
    }

    /// Destroy a node. It is disconnected first; its children are detached
    /// (left isolated and intact), not destroyed. Returns the node.
    pub fn remove_node(&mut self, id: NodeId) -> PipelineResult<AnyNode> {
        if id == self.root {
            return Err(PipelineError::RootIsImmutable);
        }
        if let Some(parent) = self.slot(id)?.parent {
            self.unbind_child(parent, id);
        }
        let children = self.slot(id)?.children.clone();
        for child in children {
            self.unbind_child(id, child);
            self.invalidate_subtree(child)?;
        }
        let slot = self.slots[id.index()]
            .take()
            .ok_or(PipelineError::InvalidTarget(id))?;
        let node = slot.node.ok_or(PipelineError::NodeBusy(id))?;
        tracing::info!("Removed node {:?} ({})", id, slot.name);
        Ok(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.slot(id).ok().and_then(|s| s.node.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AnyNode> {
        self.slot_mut(id).ok().and_then(|s| s.node.as_mut())
    }

    pub fn root_node(&self) -> &RootNode {
        match self.node(self.root).and_then(AnyNode::as_root) {
            Some(root) => root,
            None => unreachable!("slot {:?} always holds the root", self.root),
        }
    }

    fn root_node_mut(&mut self) -> &mut RootNode {
        let root = self.root;
        match self.node_mut(root).and_then(AnyNode::as_root_mut) {
            Some(root) => root,
            None => unreachable!("slot {:?} always holds the root", root),
        }
    }

    /// Display name (defaults to the node's type name, not unique).
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.slot(id).ok().map(|s| s.name.as_str())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> PipelineResult<()> {
        self.slot_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn type_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(AnyNode::type_name)
    }

    // ── Source binding ──

    /// Bind (or swap) the root's data source. Does not propagate anything;
    /// follow up with `propagate(EventKind::DatasourceChanged)`.
    pub fn bind_source(&mut self, source: &Arc<dyn DataSource>) {
        let previous = self.root_node_mut().bind_source(source);
        tracing::info!(
            "Bound data source {} (previous: {})",
            source.uri(),
            previous.as_deref().unwrap_or("none")
        );
    }

    pub fn unbind_source(&mut self) {
        self.root_node_mut().unbind_source();
        tracing::info!("Unbound data source");
    }

    // ── Structure queries ──

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).ok().and_then(|s| s.parent)
    }

    /// Children in insertion order. Empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors from the parent up to the top of the chain.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// All descendants of `id` in pre-order (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    /// True if `candidate` is `ancestor` itself or lies below it.
    pub fn is_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(candidate);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    /// Number of edges between `id` and the top of its chain.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Pre-order walk from the root: `(node, depth)`.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((cur, depth)) = stack.pop() {
            out.push((cur, depth));
            for &child in self.children(cur).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Current output capabilities of `id` (dynamic for the root).
    pub fn output_spec(&self, id: NodeId) -> PipelineResult<CapabilitySet> {
        let node = self.slot(id)?.node.as_ref().ok_or(PipelineError::NodeBusy(id))?;
        Ok(node.output_spec())
    }

    pub fn input_spec(&self, id: NodeId) -> PipelineResult<CapabilitySet> {
        let node = self.slot(id)?.node.as_ref().ok_or(PipelineError::NodeBusy(id))?;
        Ok(node.input_spec())
    }

    /// Whether a node requiring `inputs` may hang under `parent`.
    pub fn accepts(&self, parent: NodeId, inputs: &CapabilitySet) -> PipelineResult<bool> {
        if parent == self.root {
            self.slot(parent)?;
            return Ok(true);
        }
        Ok(inputs.is_subset_of(&self.output_spec(parent)?))
    }

    // ── Connection protocol ──

    /// Make `child` a child of `parent`, re-parenting it if needed.
    ///
    /// Every check runs before any link changes: on error the tree is
    /// exactly as it was.
    pub fn connect(&mut self, child: NodeId, parent: NodeId) -> PipelineResult<()> {
        if child == self.root {
            return Err(PipelineError::RootIsImmutable);
        }
        self.slot(child)?;
        self.slot(parent)?;

        if self.is_descendant(parent, child) {
            return Err(PipelineError::CyclicConnection { child, parent });
        }

        if parent != self.root {
            let inputs = self.input_spec(child)?;
            let offered = self.output_spec(parent)?;
            if let Some(capability) = inputs.first_missing_from(&offered) {
                tracing::debug!(
                    "Rejected {:?} under {:?}: missing {} (offered {})",
                    child,
                    parent,
                    capability,
                    offered
                );
                return Err(PipelineError::CapabilityMismatch {
                    capability,
                    child,
                    parent,
                });
            }
        }

        if let Some(old) = self.parent(child) {
            self.unbind_child(old, child);
        }
        self.bind_child(parent, child)?;
        tracing::info!("Connected {:?} under {:?}", child, parent);
        self.invalidate_subtree(child)
    }

    /// Detach `id` from its parent. Idempotent.
    pub fn disconnect(&mut self, id: NodeId) -> PipelineResult<()> {
        if let Some(parent) = self.slot(id)?.parent {
            self.unbind_child(parent, id);
            tracing::info!("Disconnected {:?} from {:?}", id, parent);
            self.invalidate_subtree(id)?;
        }
        Ok(())
    }

    /// Run `status_changed` for `id` and everything below it, parents first.
    /// Whatever they derived came from the parent they just left.
    fn invalidate_subtree(&mut self, id: NodeId) -> PipelineResult<()> {
        self.status_changed(id)?;
        for node in self.descendants(id) {
            self.status_changed(node)?;
        }
        Ok(())
    }

    /// Link `child` under `parent`. Walks the ancestor chain of `parent`
    /// first and refuses before touching anything if `child` is on it.
    fn bind_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<()> {
        let mut cur = Some(parent);
        while let Some(c) = cur {
            if c == child {
                return Err(PipelineError::CyclicConnection { child, parent });
            }
            cur = self.parent(c);
        }
        debug_assert!(self.parent(child).is_none(), "{:?} still has a parent", child);

        self.slot_mut(parent)?.children.push(child);
        self.slot_mut(child)?.parent = Some(parent);
        self.debug_check_links(parent);
        Ok(())
    }

    /// Unlink `child` from `parent`. Both ids must be live and linked.
    fn unbind_child(&mut self, parent: NodeId, child: NodeId) {
        if let Ok(slot) = self.slot_mut(parent) {
            let before = slot.children.len();
            slot.children.retain(|&c| c != child);
            assert_eq!(
                before,
                slot.children.len() + 1,
                "{:?} was not listed under {:?}",
                child,
                parent
            );
        }
        if let Ok(slot) = self.slot_mut(child) {
            assert_eq!(slot.parent, Some(parent), "parent link of {:?} out of sync", child);
            slot.parent = None;
        }
        self.debug_check_links(parent);
    }

    #[cfg(debug_assertions)]
    fn debug_check_links(&self, id: NodeId) {
        for &child in self.children(id) {
            assert_eq!(
                self.parent(child),
                Some(id),
                "child {:?} of {:?} points elsewhere",
                child,
                id
            );
        }
        if let Some(parent) = self.parent(id) {
            assert!(
                self.children(parent).contains(&id),
                "{:?} missing from children of {:?}",
                id,
                parent
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check_links(&self, _id: NodeId) {}

    // ── Observers ──

    pub fn add_observer(&mut self, id: NodeId, observer: &Arc<dyn Observer>) -> PipelineResult<()> {
        self.slot_mut(id)?.observers.add(observer);
        Ok(())
    }

    pub fn remove_observer(
        &mut self,
        id: NodeId,
        observer: &Arc<dyn Observer>,
    ) -> PipelineResult<()> {
        self.slot_mut(id)?.observers.remove(observer);
        Ok(())
    }

    pub fn observer_count(&self, id: NodeId) -> usize {
        self.slot(id).map(|s| s.observers.len()).unwrap_or(0)
    }

    /// Run the node's `internal_update`, then notify its observers in
    /// registration order.
    pub fn status_changed(&mut self, id: NodeId) -> PipelineResult<()> {
        let slot = self.slot_mut(id)?;
        slot.node
            .as_mut()
            .ok_or(PipelineError::NodeBusy(id))?
            .internal_update();
        slot.observers.notify(id);
        Ok(())
    }

    // ── Hooks ──

    /// Take the node out of its slot, run `f` with a context, put it back,
    /// and honour `mark_changed`.
    fn with_hook<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut AnyNode, &mut NodeContext) -> PipelineResult<T>,
    ) -> PipelineResult<T> {
        let mut node = self
            .slot_mut(id)?
            .node
            .take()
            .ok_or(PipelineError::NodeBusy(id))?;
        let (result, changed) = {
            let mut ctx = NodeContext::new(self, id);
            let result = f(&mut node, &mut ctx);
            (result, ctx.is_changed())
        };
        self.slot_mut(id)?.node = Some(node);
        let value = result?;
        if changed {
            self.status_changed(id)?;
        }
        Ok(value)
    }

    // ── Data requests ──

    /// Ask `id` for `capability`. A node that does not offer it yields
    /// `UnsupportedCapability` naming the node's type.
    pub fn request_data(
        &mut self,
        id: NodeId,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<DataValue> {
        let slot = self.slot(id)?;
        if let Some(AnyNode::Root(root)) = &slot.node {
            return root.request_data(capability, params);
        }
        let answer = self.with_hook(id, |node, ctx| match node.as_plugin_mut() {
            Some(plugin) => plugin.request_data(capability, params, ctx),
            None => Ok(None),
        })?;
        answer.ok_or_else(|| PipelineError::UnsupportedCapability {
            capability,
            node_type: self.type_name(id).unwrap_or("unknown").to_string(),
        })
    }

    /// Like `request_data`, but "nobody offers this" is `Ok(None)`.
    pub fn try_request_data(
        &mut self,
        id: NodeId,
        capability: Capability,
        params: &RequestParams,
    ) -> PipelineResult<Option<DataValue>> {
        match self.request_data(id, capability, params) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unsupported() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Propagation ──

    /// Inject an event at the root and deliver it to every attached node,
    /// parents before children. Returns the finished event.
    pub fn propagate(&mut self, kind: EventKind) -> PipelineResult<Event> {
        let mut event = Event::new(kind);
        let root = self.root;
        self.propagate_down(root, &mut event)?;
        tracing::debug!(
            "Propagated {:?} to {} node(s)",
            event.kind(),
            event.visited_count()
        );
        Ok(event)
    }

    /// Pre-order pass from `id` through its subtree; each node at most once
    /// per event. A failing handler stops the pass and its error is returned.
    pub fn propagate_down(&mut self, id: NodeId, event: &mut Event) -> PipelineResult<()> {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            self.slot(node)?;
            if !event.visit(node) {
                continue;
            }
            self.run_handler(node, event, Direction::Down)?;
            stack.extend(self.children(node).iter().rev().copied());
        }
        Ok(())
    }

    /// Pass from `id` up the parent chain; each node at most once per event.
    pub fn propagate_up(&mut self, id: NodeId, event: &mut Event) -> PipelineResult<()> {
        let mut cur = Some(id);
        while let Some(node) = cur {
            self.slot(node)?;
            if !event.visit(node) {
                break;
            }
            self.run_handler(node, event, Direction::Up)?;
            cur = self.parent(node);
        }
        Ok(())
    }

    fn run_handler(&mut self, id: NodeId, event: &Event, direction: Direction) -> PipelineResult<()> {
        if id == self.root {
            return Ok(());
        }
        tracing::trace!("{:?} handling {:?} ({:?})", id, event.kind(), direction);
        self.with_hook(id, |node, ctx| match node.as_plugin_mut() {
            Some(plugin) => match direction {
                Direction::Down => plugin.handle_downward_event(event, ctx),
                Direction::Up => plugin.handle_upward_event(event, ctx),
            },
            None => Ok(()),
        })
    }
}
