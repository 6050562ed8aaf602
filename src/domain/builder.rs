//! Tree builder for parsing inferred edge lists into event trees.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::arena::EventTree;
use crate::domain::counts::CorrectedCountsView;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::Node;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Translate a breakpoint-candidate pair into a locus interval.
///
/// The literal pair `(0,0)` is the root sentinel and is never translated.
pub(crate) fn translate_candidates(
    first: usize,
    second: usize,
    counts: &dyn CorrectedCountsView,
) -> Result<Node, String> {
    if (first, second) == (0, 0) {
        return Ok(Node::ROOT);
    }
    let to_locus = |candidate: usize| {
        counts.candidate_to_locus(candidate).ok_or_else(|| {
            format!(
                "breakpoint candidate {} out of range (have {})",
                candidate,
                counts.candidate_count()
            )
        })
    };
    let node = Node::new(to_locus(first)?, to_locus(second)?);
    if node.start >= node.end {
        return Err(format!(
            "candidates ({},{}) translate to empty interval {}",
            first, second, node
        ));
    }
    Ok(node)
}

/// Constructs an [`EventTree`] from `(c1,c2)-(c3,c4)` edge lines.
pub struct TreeBuilder {
    relationship_cache: HashMap<Node, Vec<Node>>,
    parents: HashMap<Node, Node>,
    visited_nodes: HashSet<Node>,
    edge_regex: Regex,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            relationship_cache: HashMap::new(),
            parents: HashMap::new(),
            visited_nodes: HashSet::new(),
            edge_regex: Regex::new(r"^\(\s*(\d+)\s*,\s*(\d+)\s*\)\s*-\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)$")
                .unwrap(),
        }
    }

    /// Build the tree from edge list content in breakpoint-candidate space.
    ///
    /// Fails on the first malformed line; no partial tree is returned.
    #[instrument(level = "debug", skip(self, content, counts))]
    pub fn build_from_str(
        &mut self,
        content: &str,
        counts: &dyn CorrectedCountsView,
    ) -> TreeResult<EventTree> {
        // Reset state for fresh parse
        self.relationship_cache.clear();
        self.parents.clear();
        self.visited_nodes.clear();

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.process_line(idx + 1, line, counts)?;
        }
        debug!("parsed {} edges", self.parents.len());

        let tree = self.build_tree()?;
        self.check_all_reachable(&tree)?;
        Ok(tree)
    }

    fn process_line(
        &mut self,
        line_no: usize,
        line: &str,
        counts: &dyn CorrectedCountsView,
    ) -> TreeResult<()> {
        let caps = self.edge_regex.captures(line).ok_or_else(|| {
            DomainError::tree_format(line_no, format!("expected '(c1,c2)-(c3,c4)', got '{}'", line))
        })?;
        let mut fields = [0usize; 4];
        for (slot, field) in fields.iter_mut().zip(caps.iter().skip(1)) {
            let text = field.map(|m| m.as_str()).unwrap_or_default();
            *slot = text
                .parse()
                .map_err(|_| DomainError::tree_format(line_no, format!("bad index '{}'", text)))?;
        }

        let parent = translate_candidates(fields[0], fields[1], counts)
            .map_err(|m| DomainError::tree_format(line_no, m))?;
        let child = translate_candidates(fields[2], fields[3], counts)
            .map_err(|m| DomainError::tree_format(line_no, m))?;

        if parent == child {
            return Err(DomainError::tree_format(line_no, format!("self edge on {}", child)));
        }
        if child.is_root() {
            return Err(DomainError::tree_format(line_no, "root (0,0) cannot have a parent"));
        }
        if let Some(existing) = self.parents.get(&child) {
            return Err(DomainError::tree_format(
                line_no,
                format!("node {} already has parent {}", child, existing),
            ));
        }

        self.parents.insert(child, parent);
        self.relationship_cache.entry(parent).or_default().push(child);
        Ok(())
    }

    fn build_tree(&mut self) -> TreeResult<EventTree> {
        let mut tree = EventTree::new();
        let mut stack = vec![(Node::ROOT, tree.root())];
        self.visited_nodes.insert(Node::ROOT);

        while let Some((current, current_idx)) = stack.pop() {
            let Some(children) = self.relationship_cache.get(&current) else {
                continue;
            };
            let mut inserted = Vec::with_capacity(children.len());
            for &child in children {
                // Cycle detection
                if !self.visited_nodes.insert(child) {
                    return Err(DomainError::CycleDetected(child));
                }
                let child_idx = tree
                    .insert_node(child, current_idx)
                    .ok_or(DomainError::CycleDetected(child))?;
                inserted.push((child, child_idx));
            }
            // Reverse so siblings are expanded in file order
            stack.extend(inserted.into_iter().rev());
        }

        Ok(tree)
    }

    /// Every node named in the edge list must hang below the root.
    fn check_all_reachable(&self, tree: &EventTree) -> TreeResult<()> {
        let mut orphans: Vec<Node> = self
            .parents
            .keys()
            .filter(|n| !tree.contains(n))
            .copied()
            .collect();
        orphans.sort();
        let Some(&orphan) = orphans.first() else {
            return Ok(());
        };

        // Single parents mean an unreachable node either sits on a cycle or
        // leads to a node without a parent.
        let mut seen = HashSet::new();
        let mut current = orphan;
        while let Some(&parent) = self.parents.get(&current) {
            if !seen.insert(current) {
                return Err(DomainError::CycleDetected(current));
            }
            current = parent;
        }
        Err(DomainError::Disconnected(orphan))
    }
}
