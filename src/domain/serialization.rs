//! Text and JSON renderings of trees, attachments and copy-number matrices.
//!
//! Dumped files refer to loci by genomic coordinates (`chr_binstart`) instead
//! of matrix indices. The parsers at the bottom map them back.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::arena::EventTree;
use crate::domain::attachment::Attachment;
use crate::domain::counts::CorrectedCountsView;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::Node;
use crate::domain::reconstruction::CopyNumberMatrix;

/// Rendering of the root in dumped tree and attachment files.
pub const ROOT_LABEL: &str = "(0,0)";

static DUMPED_EDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(([^,()]+),([^,()]+)\)-\(([^,()]+),([^,()]+)\)$").unwrap()
});

/// Genomic coordinates of an event.
///
/// The exclusive end locus may sit on the next chromosome, so it carries its
/// own chromosome id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabel {
    pub chr: u32,
    pub bin_start: u64,
    pub chr_end: u32,
    pub bin_end: u64,
}

/// JSON form of a node: the label for events, `{}` for the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrettyNode {
    Event(NodeLabel),
    Root {},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrettyEdge {
    pub parent: PrettyNode,
    pub child: PrettyNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrettyCell {
    pub cell: String,
    pub node: PrettyNode,
}

/// Tree and attachment relabelled with genomic coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrettyInference {
    pub edges: Vec<PrettyEdge>,
    pub attachment: Vec<PrettyCell>,
}

impl PrettyInference {
    pub fn new(
        tree: &EventTree,
        attachment: &Attachment,
        counts: &dyn CorrectedCountsView,
    ) -> Self {
        let edges = tree
            .edges()
            .into_iter()
            .map(|(parent, child)| PrettyEdge {
                parent: pretty_node(&parent, counts),
                child: pretty_node(&child, counts),
            })
            .collect();
        let attachment = attachment
            .iter()
            .enumerate()
            .map(|(cell, node)| PrettyCell {
                cell: cell_name(cell, counts),
                node: pretty_node(node, counts),
            })
            .collect();
        Self { edges, attachment }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Coordinates of `node`; None for the root.
///
/// `bin_end` is the start of the exclusive end locus.
pub fn label_node(node: &Node, counts: &dyn CorrectedCountsView) -> Option<NodeLabel> {
    if node.is_root() {
        return None;
    }
    // an end one past the last locus stays on the last chromosome
    let end_locus = node.end.min(counts.locus_count().saturating_sub(1));
    Some(NodeLabel {
        chr: counts.chromosome_of(node.start),
        bin_start: counts.bin_start(node.start),
        chr_end: counts.chromosome_of(end_locus),
        bin_end: counts.bin_start(node.end),
    })
}

pub fn pretty_node(node: &Node, counts: &dyn CorrectedCountsView) -> PrettyNode {
    label_node(node, counts).map_or(PrettyNode::Root {}, PrettyNode::Event)
}

/// `(chr_binstart,chrend_binend)`, or `(0,0)` for the root.
pub fn node_to_str(node: &Node, counts: &dyn CorrectedCountsView) -> String {
    match label_node(node, counts) {
        Some(l) => format!("({}_{},{}_{})", l.chr, l.bin_start, l.chr_end, l.bin_end),
        None => ROOT_LABEL.to_string(),
    }
}

fn cell_name(cell: usize, counts: &dyn CorrectedCountsView) -> String {
    counts
        .cell_names()
        .get(cell)
        .cloned()
        .unwrap_or_else(|| format!("cell_{}", cell))
}

/// One `cell_name;chr_binstart;chr_binend` line per cell.
pub fn format_attachment(attachment: &Attachment, counts: &dyn CorrectedCountsView) -> String {
    attachment
        .iter()
        .enumerate()
        .map(|(cell, node)| {
            let name = cell_name(cell, counts);
            match label_node(node, counts) {
                Some(l) => format!(
                    "{};{}_{};{}_{}\n",
                    name, l.chr, l.bin_start, l.chr_end, l.bin_end
                ),
                None => format!("{};{};{}\n", name, ROOT_LABEL, ROOT_LABEL),
            }
        })
        .collect()
}

/// One `parent-child` line per edge, preorder.
pub fn format_tree(tree: &EventTree, counts: &dyn CorrectedCountsView) -> String {
    tree.edges()
        .iter()
        .map(|(parent, child)| {
            format!("{}-{}\n", node_to_str(parent, counts), node_to_str(child, counts))
        })
        .collect()
}

/// `;` separated grid, one row per locus.
pub fn format_matrix(matrix: &CopyNumberMatrix) -> String {
    matrix
        .view()
        .rows()
        .into_iter()
        .map(|row| format!("{}\n", row.iter().join(";")))
        .collect()
}

/// Parse a `chr_binstart` token, or the bare `0` used by the root.
fn parse_coordinate(token: &str) -> Option<(u32, u64)> {
    let (chr, bin) = token.trim().split_once('_')?;
    Some((chr.parse().ok()?, bin.parse().ok()?))
}

fn locate_node(
    start: &str,
    end: &str,
    counts: &dyn CorrectedCountsView,
) -> Result<Node, String> {
    if start.trim() == "0" && end.trim() == "0" {
        return Ok(Node::ROOT);
    }
    let locate = |token: &str| {
        parse_coordinate(token)
            .and_then(|(chr, bin)| counts.locate(chr, bin))
            .ok_or_else(|| format!("unknown locus '{}'", token))
    };
    let node = Node::new(locate(start)?, locate(end)?);
    if node.start >= node.end {
        return Err(format!("empty or inverted interval ({},{})", start, end));
    }
    Ok(node)
}

/// Read back a dumped tree as locus-space edges.
pub fn parse_dumped_tree(
    content: &str,
    counts: &dyn CorrectedCountsView,
) -> DomainResult<Vec<(Node, Node)>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(idx, line)| {
            let caps = DUMPED_EDGE.captures(line.trim()).ok_or_else(|| {
                DomainError::tree_format(idx + 1, format!("unrecognized edge '{}'", line))
            })?;
            let parent = locate_node(&caps[1], &caps[2], counts)
                .map_err(|m| DomainError::tree_format(idx + 1, m))?;
            let child = locate_node(&caps[3], &caps[4], counts)
                .map_err(|m| DomainError::tree_format(idx + 1, m))?;
            Ok((parent, child))
        })
        .collect()
}

/// Read back a dumped attachment as `(cell_name, node)` pairs.
pub fn parse_dumped_attachment(
    content: &str,
    counts: &dyn CorrectedCountsView,
) -> DomainResult<Vec<(String, Node)>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(idx, line)| {
            let fields: Vec<&str> = line.trim().split(';').collect();
            if fields.len() != 3 {
                return Err(DomainError::attachment_format(
                    idx + 1,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            }
            let node = if fields[1] == ROOT_LABEL && fields[2] == ROOT_LABEL {
                Node::ROOT
            } else {
                locate_node(fields[1], fields[2], counts)
                    .map_err(|m| DomainError::attachment_format(idx + 1, m))?
            };
            Ok((fields[0].to_string(), node))
        })
        .collect()
}

/// Breakpoint-candidate indices of a locus-space node; `(0,0)` for the root.
pub fn node_to_candidates(node: &Node, counts: &dyn CorrectedCountsView) -> Option<(usize, usize)> {
    if node.is_root() {
        return Some((0, 0));
    }
    Some((
        counts.locus_to_candidate(node.start)?,
        counts.locus_to_candidate(node.end)?,
    ))
}
