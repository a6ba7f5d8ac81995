//! Test tree builders

use vispipe::pipeline::{
    AnyNode, BuiltinNode, FilterNode, NodeId, PipelineTree, ScaleNode, StatisticsNode,
};

pub fn filter() -> AnyNode {
    AnyNode::filter(FilterNode::new())
}

pub fn statistics() -> AnyNode {
    AnyNode::statistics(StatisticsNode::new())
}

pub fn scale(gain: f64) -> AnyNode {
    AnyNode::scale(ScaleNode::new(gain, 0.0).unwrap())
}

/// Builds `root -> n1 -> n2 -> ...` out of filter nodes.
pub struct ChainBuilder {
    tree: PipelineTree,
    len: usize,
}

impl ChainBuilder {
    pub fn new(len: usize) -> Self {
        Self {
            tree: PipelineTree::new(),
            len,
        }
    }

    pub fn on(mut self, tree: PipelineTree) -> Self {
        self.tree = tree;
        self
    }

    /// Returns the tree and the chain's ids, top first.
    pub fn build(mut self) -> (PipelineTree, Vec<NodeId>) {
        let mut ids = Vec::with_capacity(self.len);
        let mut parent = self.tree.root();
        for _ in 0..self.len {
            let id = self.tree.add_child(parent, filter()).unwrap();
            ids.push(id);
            parent = id;
        }
        (self.tree, ids)
    }
}

pub fn statistics_node(tree: &PipelineTree, id: NodeId) -> &StatisticsNode {
    match tree.node(id) {
        Some(AnyNode::Builtin(BuiltinNode::Statistics(node))) => node,
        other => panic!("{:?} is not a statistics node: {:?}", id, other),
    }
}

pub fn filter_node(tree: &PipelineTree, id: NodeId) -> &FilterNode {
    match tree.node(id) {
        Some(AnyNode::Builtin(BuiltinNode::Filter(node))) => node,
        other => panic!("{:?} is not a filter node: {:?}", id, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder() {
        let (tree, ids) = ChainBuilder::new(3).build();
        assert_eq!(ids.len(), 3);
        assert_eq!(tree.parent(ids[0]), Some(tree.root()));
        assert_eq!(tree.parent(ids[2]), Some(ids[1]));
    }
}
