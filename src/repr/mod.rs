//! Tree model representation.
//!
//! Structure-of-arrays storage shared by the boosted trainer and the
//! importance forest: flat per-node arrays for cache-friendly traversal,
//! missing values routed by a per-node default direction.

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{NodeId, Tree, TreeBuilder};
