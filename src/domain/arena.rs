//! Arena-backed event tree.
//!
//! Nodes live in a generational arena and refer to each other by index, so
//! parent lookups never need shared ownership.

use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::node::Node;

/// Tree node in the arena-based event tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Event interval for this node
    pub node: Node,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in insertion order
    pub children: Vec<Index>,
}

/// Rooted out-tree of copy-number events.
///
/// The root is always `(0,0)`. Each node appears at most once, which is
/// enforced through the `Node -> Index` lookup table.
#[derive(Debug, Clone)]
pub struct EventTree {
    arena: Arena<TreeNode>,
    lookup: HashMap<Node, Index>,
    root: Index,
}

impl Default for EventTree {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode {
            node: Node::ROOT,
            parent: None,
            children: Vec::new(),
        });
        let mut lookup = HashMap::new();
        lookup.insert(Node::ROOT, root);
        Self {
            arena,
            lookup,
            root,
        }
    }

    /// Attach `node` below `parent`.
    ///
    /// Returns None when the parent index is stale or the node is already present.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, node: Node, parent: Index) -> Option<Index> {
        if self.lookup.contains_key(&node) || !self.arena.contains(parent) {
            return None;
        }
        let node_idx = self.arena.insert(TreeNode {
            node,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(parent) = self.arena.get_mut(parent) {
            parent.children.push(node_idx);
        }
        self.lookup.insert(node, node_idx);
        Some(node_idx)
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn index_of(&self, node: &Node) -> Option<Index> {
        self.lookup.get(node).copied()
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.lookup.contains_key(node)
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// True when the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 1
    }

    /// The unique predecessor of `node`, None for the root or unknown nodes.
    pub fn parent_of(&self, node: &Node) -> Option<Node> {
        let idx = self.index_of(node)?;
        let parent = self.arena.get(idx)?.parent?;
        self.arena.get(parent).map(|p| p.node)
    }

    pub fn children_of(&self, node: &Node) -> Vec<Node> {
        self.index_of(node)
            .and_then(|idx| self.arena.get(idx))
            .map(|n| {
                n.children
                    .iter()
                    .filter_map(|&c| self.arena.get(c).map(|c| c.node))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Parent/child pairs in preorder.
    pub fn edges(&self) -> Vec<(Node, Node)> {
        self.iter()
            .filter_map(|(_, n)| {
                let parent = self.arena.get(n.parent?)?;
                Some((parent.node, n.node))
            })
            .collect()
    }

    /// Longest root-to-leaf path counted in nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.arena.get(idx) {
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }
        max_depth
    }

    /// Collects all nodes without children.
    pub fn leaf_nodes(&self) -> Vec<Node> {
        self.iter()
            .filter(|(_, n)| n.children.is_empty())
            .map(|(_, n)| n.node)
            .collect()
    }
}

/// Structural equality: same root and the same parent/child pairs.
impl PartialEq for EventTree {
    fn eq(&self, other: &Self) -> bool {
        let mut mine = self.edges();
        let mut theirs = other.edges();
        mine.sort();
        theirs.sort();
        self.len() == other.len() && mine == theirs
    }
}

impl Eq for EventTree {}

impl fmt::Display for EventTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (parent, child) in self.edges() {
            writeln!(f, "{}-{}", parent, child)?;
        }
        Ok(())
    }
}

/// Preorder traversal, children left to right.
pub struct TreeIterator<'a> {
    tree: &'a EventTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a EventTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

/// Postorder traversal: every node is yielded after all of its descendants,
/// the root last.
pub struct PostOrderIterator<'a> {
    tree: &'a EventTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a EventTree) -> Self {
        Self {
            tree,
            stack: vec![(tree.root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
