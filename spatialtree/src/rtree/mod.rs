//! The node model and the two tree builders.
//!
//! ## Module Organization
//!
//! - `entry` / `node`: what a block of the index file holds
//! - `split`: the R*-tree split heuristics
//! - `rstar_tree`: incremental insertion with forced reinsertion
//! - `bulk_load`: one-pass bottom-up construction
//! - `delete`: leaf search and entry removal shared by both trees
//! - `integrity`: structural verification

mod bulk_load;
mod delete;
mod entry;
mod integrity;
mod node;
mod rstar_tree;
mod split;

pub use bulk_load::BulkLoadedRStarTree;
pub use delete::{delete_entry, find_leaf};
pub use entry::{Entry, EntryKind, LeafRef};
pub use integrity::{check_tree, IntegrityReport};
pub use node::Node;
pub use rstar_tree::RStarTree;
pub use split::split_entries;
