//! Cell attachment: which event node each cell hangs below.

use std::ops::Index;

use tracing::{debug, instrument};

use crate::domain::arena::EventTree;
use crate::domain::builder::translate_candidates;
use crate::domain::counts::CorrectedCountsView;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::Node;

/// Number of `;` separated fields in an inferred attachment line.
const ATTACHMENT_FIELDS: usize = 5;

/// Dense mapping from cell index to its attached node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attachment {
    nodes: Vec<Node>,
}

impl Attachment {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Parse `cell_name;label_start;label_end;c1;c2` lines.
    ///
    /// Only the two trailing candidate indices are used. Line order defines
    /// the cell index.
    #[instrument(level = "debug", skip(content, counts))]
    pub fn parse(content: &str, counts: &dyn CorrectedCountsView) -> DomainResult<Self> {
        let mut nodes = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() != ATTACHMENT_FIELDS {
                return Err(DomainError::attachment_format(
                    line_no,
                    format!("expected {} fields, found {}", ATTACHMENT_FIELDS, fields.len()),
                ));
            }
            let candidate = |text: &str| {
                text.parse::<usize>().map_err(|_| {
                    DomainError::attachment_format(line_no, format!("bad candidate index '{}'", text))
                })
            };
            let first = candidate(fields[3])?;
            let second = candidate(fields[4])?;
            let node = translate_candidates(first, second, counts)
                .map_err(|m| DomainError::attachment_format(line_no, m))?;
            nodes.push(node);
        }
        debug!("parsed attachment of {} cells", nodes.len());
        Ok(Self { nodes })
    }

    /// Check that every attached node exists in `tree` and that there is one
    /// entry per cell.
    pub fn validate(&self, tree: &EventTree, cell_count: usize) -> DomainResult<()> {
        if self.nodes.len() != cell_count {
            return Err(DomainError::AttachmentSize {
                attached: self.nodes.len(),
                expected: cell_count,
            });
        }
        match self.nodes.iter().position(|n| !tree.contains(n)) {
            Some(cell) => Err(DomainError::AttachmentReference {
                cell,
                node: self.nodes[cell],
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, cell: usize) -> Option<&Node> {
        self.nodes.get(cell)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Cells attached to `node`, in index order.
    pub fn cells_at(&self, node: &Node) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| *n == node)
            .map(|(c, _)| c)
            .collect()
    }

    /// Move every listed cell onto `node`.
    pub(crate) fn reassign(&mut self, cells: &[usize], node: Node) {
        for &cell in cells {
            self.nodes[cell] = node;
        }
    }
}

impl Index<usize> for Attachment {
    type Output = Node;

    fn index(&self, cell: usize) -> &Node {
        &self.nodes[cell]
    }
}

impl<'a> IntoIterator for &'a Attachment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
