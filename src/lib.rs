//! cntree: copy-number reconstruction from inferred event trees.
//!
//! An inferred tree of breakpoint events plus an attachment of every cell to
//! a tree node determines an integer copy-number matrix over genomic loci.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
