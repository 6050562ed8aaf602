//! Domain layer: event trees, attachments and copy-number reconstruction
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod attachment;
pub mod builder;
pub mod counts;
pub mod error;
pub mod node;
pub mod reconstruction;
pub mod serialization;
pub mod tree_display;

pub use arena::{EventTree, TreeNode};
pub use attachment::Attachment;
pub use builder::TreeBuilder;
pub use counts::{CorrectedCounts, CorrectedCountsView, Locus};
pub use error::{DomainError, DomainResult};
pub use node::Node;
pub use reconstruction::{reconstruct, reconstruct_traced, CopyNumberMatrix, Reconstruction};
pub use serialization::{NodeLabel, PrettyInference, PrettyNode};
pub use tree_display::TreeDisplay;
