//! # Spatialtree - Disk-Backed R*-Tree
//!
//! This crate provides a multidimensional spatial index persisted in
//! fixed-size blocks, with incremental insertion, one-shot bulk loading and
//! range, nearest-neighbour and skyline queries.
//!
//! ## Features
//!
//! - **Block Storage**: Records and nodes in two files of 32KB blocks, read on demand
//! - **R*-Tree Insertion**: Overlap-aware subtree choice, forced reinsertion and margin-driven splits
//! - **Bulk Loading**: Bottom-up packing of a sorted dataset
//! - **Queries**: Range, k-nearest-neighbour (branch-and-bound), radius and skyline
//! - **Persistent**: Both trees can be reopened from their files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spatialtree::{BlockStore, BoundingBox, RStarTree, Record, SpatialIndex, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let records = vec![
//!     Record::new(1, "origin", vec![0.0, 0.0]),
//!     Record::new(2, "near", vec![1.0, 1.0]),
//!     Record::new(3, "far", vec![10.0, 10.0]),
//! ];
//!
//! let store = BlockStore::open(StoreConfig::new("/tmp/spatialtree"))?;
//! store.create_data_file(&records, true)?;
//! let tree = RStarTree::build_from_data_file(store)?;
//!
//! let hits = tree.range_query(&BoundingBox::from_ranges(&[(0.0, 2.0), (0.0, 2.0)])?)?;
//! assert_eq!(hits.len(), 2);
//!
//! let nearest = tree.knn(&[0.0, 0.0], 1)?;
//! let record = tree.resolve(&nearest[0])?;
//! assert_eq!(record.map(|r| r.id()), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod block_store;
pub mod bounding_box;
pub mod config;
pub mod query;
pub mod record;
pub mod rtree;
pub mod spatial_index;

pub use block_store::{
    BlockId, BlockStore, Capacity, RecordId, SpatialError, SpatialResult, StoreStats, BLOCK_SIZE,
    LEAF_LEVEL, ROOT_BLOCK_ID,
};
pub use bounding_box::{BoundingBox, Bounds};
pub use config::StoreConfig;
pub use record::Record;
pub use rtree::{BulkLoadedRStarTree, Entry, EntryKind, IntegrityReport, LeafRef, Node, RStarTree};
pub use spatial_index::SpatialIndex;
