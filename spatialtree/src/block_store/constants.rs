//! Constants for the block store and the R*-tree built on it.

/// Default block size (32KB) for both the data file and the index file
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Block 0 of every file holds its metadata
pub const METADATA_BLOCK_ID: u64 = 0;

/// The incremental tree always keeps its root in this block
pub const ROOT_BLOCK_ID: u64 = 1;

/// Level of leaf nodes; levels grow towards the root
pub const LEAF_LEVEL: u32 = 1;

/// Bytes used by the payload length prefix at the start of every block
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Entries considered by the overlap test of ChooseSubtree on wide nodes
pub const CHOOSE_SUBTREE_P: usize = 32;

/// Minimum fill of a non-root node, as a fraction of the maximum
pub const MIN_FILL_FACTOR: f64 = 0.4;

/// Share of an overflowing node's entries removed by forced reinsertion
pub const REINSERT_FACTOR: f64 = 0.3;

/// A leaf below this fraction of the maximum is reported as underflowing on delete
pub const UNDERFLOW_FACTOR: f64 = 0.3;

/// Smallest fanout the split distributions are defined for
pub const MIN_FANOUT: usize = 4;

/// Default file names inside a store directory
pub const DATA_FILE_NAME: &str = "datafile.dat";
pub const INDEX_FILE_NAME: &str = "indexfile.dat";
