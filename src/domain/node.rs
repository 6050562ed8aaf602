//! Event nodes: half-open locus intervals

use std::fmt;
use std::ops::Range;

/// A copy-number event spanning loci `[start, end)`.
///
/// The root `(0, 0)` stands for the germline state and has no genomic extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    pub start: usize,
    pub end: usize,
}

impl Node {
    pub const ROOT: Node = Node { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// Number of loci covered by the event.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loci(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

impl From<(usize, usize)> for Node {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}
