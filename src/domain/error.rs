//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::Node;

/// Domain errors represent violations of the tree, attachment and counts invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid tree format at line {line}: {message}")]
    TreeFormat { line: usize, message: String },

    #[error("cycle detected in event tree at node {0}")]
    CycleDetected(Node),

    #[error("node {0} is not reachable from the root (0,0)")]
    Disconnected(Node),

    #[error("invalid attachment format at line {line}: {message}")]
    AttachmentFormat { line: usize, message: String },

    #[error("cell {cell} is attached to node {node} which is not in the tree")]
    AttachmentReference { cell: usize, node: Node },

    #[error("attachment has {attached} cells but the counts matrix has {expected}")]
    AttachmentSize { attached: usize, expected: usize },

    #[error("invalid corrected counts at line {line}: {message}")]
    CountsFormat { line: usize, message: String },

    #[error("invariant violated at node {node}: {message}")]
    InvariantViolation { node: Node, message: String },
}

impl DomainError {
    pub(crate) fn tree_format(line: usize, message: impl Into<String>) -> Self {
        Self::TreeFormat {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn attachment_format(line: usize, message: impl Into<String>) -> Self {
        Self::AttachmentFormat {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn counts_format(line: usize, message: impl Into<String>) -> Self {
        Self::CountsFormat {
            line,
            message: message.into(),
        }
    }

    /// True for malformed or structurally invalid input data.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::InvariantViolation { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
