//! Copy-number reconstruction over an event tree.
//!
//! Nodes are visited in postorder. Each node averages the corrected counts
//! of the bin/cell slots it is still responsible for, assigns the rounded
//! mean to all of them and hands its cells to the parent. A slot is resolved
//! at most once, by the deepest node covering it.

use ndarray::{Array2, ArrayView2, Axis};
use tracing::{debug, instrument, trace};

use crate::domain::arena::EventTree;
use crate::domain::attachment::Attachment;
use crate::domain::counts::CorrectedCountsView;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::Node;

/// Loci x cells integer copy numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyNumberMatrix {
    values: Array2<i64>,
}

impl CopyNumberMatrix {
    pub fn new(values: Array2<i64>) -> Self {
        Self { values }
    }

    pub fn locus_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn cell_count(&self) -> usize {
        self.values.ncols()
    }

    pub fn get(&self, locus: usize, cell: usize) -> i64 {
        self.values[[locus, cell]]
    }

    pub fn view(&self) -> ArrayView2<'_, i64> {
        self.values.view()
    }

    pub fn into_inner(self) -> Array2<i64> {
        self.values
    }
}

/// Per-node bookkeeping of one reconstruction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeResolution {
    pub node: Node,
    /// Cells the node was responsible for when visited
    pub cells: Vec<usize>,
    /// Slots resolved by this node
    pub resolved: usize,
    /// Shared copy number assigned to those slots
    pub value: Option<i64>,
}

/// Matrix plus the scratch state that produced it.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub matrix: CopyNumberMatrix,
    /// Resolution bitmap before any row removal
    pub resolved: Array2<bool>,
    /// Nodes in visiting order
    pub steps: Vec<NodeResolution>,
    /// Synthetic chromosome-end rows removed from the output
    pub removed_rows: Vec<usize>,
}

/// Reconstruct the copy-number matrix, see [`reconstruct_traced`].
pub fn reconstruct(
    tree: &EventTree,
    attachment: &Attachment,
    counts: &dyn CorrectedCountsView,
    neutral_cn: i64,
) -> DomainResult<CopyNumberMatrix> {
    reconstruct_traced(tree, attachment, counts, neutral_cn).map(|r| r.matrix)
}

/// Reconstruct the copy-number matrix and keep the per-node trace.
///
/// Slots never covered by a node keep `neutral_cn`, in particular every bin
/// of a cell attached to the root. Averages are rounded half to even.
#[instrument(level = "debug", skip(tree, attachment, counts))]
pub fn reconstruct_traced(
    tree: &EventTree,
    attachment: &Attachment,
    counts: &dyn CorrectedCountsView,
    neutral_cn: i64,
) -> DomainResult<Reconstruction> {
    let loci = counts.locus_count();
    let cells = counts.cell_count();
    attachment.validate(tree, cells)?;

    let mut matrix = Array2::from_elem((loci, cells), neutral_cn);
    let mut resolved = Array2::from_elem((loci, cells), false);
    let mut working = attachment.clone();
    let mut steps = Vec::new();

    for (_, tree_node) in tree.iter_postorder() {
        let node = tree_node.node;
        if node.is_root() {
            continue;
        }
        if node.end > loci {
            return Err(DomainError::InvariantViolation {
                node,
                message: format!("interval ends past the last locus {}", loci),
            });
        }

        let attached = working.cells_at(&node);
        if !attached.is_empty() {
            let already_resolved: usize = attached
                .iter()
                .map(|&cell| node.loci().filter(|&bin| resolved[[bin, cell]]).count())
                .sum();
            let bin_count = (node.len() * attached.len())
                .checked_sub(already_resolved)
                .ok_or_else(|| DomainError::InvariantViolation {
                    node,
                    message: format!(
                        "{} resolved slots exceed the {} slots of {} cells",
                        already_resolved,
                        node.len() * attached.len(),
                        attached.len()
                    ),
                })?;

            let mut value = None;
            if bin_count > 0 {
                let mut summed = 0.0;
                for &cell in &attached {
                    for bin in node.loci() {
                        if !resolved[[bin, cell]] {
                            summed += counts.corrected_count(bin, cell);
                        }
                    }
                }
                let cn = (summed / bin_count as f64).round_ties_even() as i64;
                for &cell in &attached {
                    for bin in node.loci() {
                        if !resolved[[bin, cell]] {
                            matrix[[bin, cell]] = cn;
                            resolved[[bin, cell]] = true;
                        }
                    }
                }
                value = Some(cn);
            }
            trace!(
                "node {}: {} cells, {} slots resolved, value {:?}",
                node,
                attached.len(),
                bin_count,
                value
            );
            steps.push(NodeResolution {
                node,
                cells: attached.clone(),
                resolved: bin_count,
                value,
            });
        }

        let parent = tree_node
            .parent
            .and_then(|p| tree.get_node(p))
            .map(|p| p.node)
            .ok_or_else(|| DomainError::InvariantViolation {
                node,
                message: "non-root node without parent".to_string(),
            })?;
        working.reassign(&attached, parent);
    }

    let mut removed_rows = Vec::new();
    if counts.chromosome_ends_were_synthesized() {
        let (keep, removed): (Vec<usize>, Vec<usize>) =
            (0..loci).partition(|&l| !counts.is_last_locus_in_chromosome(l));
        matrix = matrix.select(Axis(0), &keep);
        removed_rows = removed;
    }
    debug!(
        "reconstructed {}x{} matrix from {} nodes, removed {} chromosome end rows",
        matrix.nrows(),
        matrix.ncols(),
        steps.len(),
        removed_rows.len()
    );

    Ok(Reconstruction {
        matrix: CopyNumberMatrix::new(matrix),
        resolved,
        steps,
        removed_rows,
    })
}
