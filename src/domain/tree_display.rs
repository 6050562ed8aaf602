//! Terminal rendering of event trees via termtree.

use generational_arena::Index;
use termtree::Tree;

use crate::domain::arena::EventTree;
use crate::domain::counts::CorrectedCountsView;
use crate::domain::node::Node;
use crate::domain::serialization::node_to_str;

pub trait TreeDisplay {
    /// Build a printable tree, labelling every node with `label`.
    fn to_tree_string(&self, label: &dyn Fn(&Node) -> String) -> Tree<String>;

    /// Printable tree with genomic coordinates as labels.
    fn to_labelled_tree(&self, counts: &dyn CorrectedCountsView) -> Tree<String> {
        self.to_tree_string(&|node| node_to_str(node, counts))
    }
}

impl TreeDisplay for EventTree {
    fn to_tree_string(&self, label: &dyn Fn(&Node) -> String) -> Tree<String> {
        fn build_tree(
            tree: &EventTree,
            node_idx: Index,
            parent_tree: &mut Tree<String>,
            label: &dyn Fn(&Node) -> String,
        ) {
            if let Some(node) = tree.get_node(node_idx) {
                for &child_idx in &node.children {
                    if let Some(child) = tree.get_node(child_idx) {
                        let mut child_tree = Tree::new(label(&child.node));
                        build_tree(tree, child_idx, &mut child_tree, label);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        let root_label = self
            .get_node(self.root())
            .map(|n| label(&n.node))
            .unwrap_or_else(|| "Empty tree".to_string());
        let mut rendered = Tree::new(root_label);
        build_tree(self, self.root(), &mut rendered, label);
        rendered
    }
}
