//! Fixed-size block storage for records and tree nodes.
//!
//! ## Module Organization
//!
//! - `types`: errors, identifiers, file metadata and statistics
//! - `constants`: block geometry and tree tuning constants
//! - `block_file`: length-prefixed block I/O over one file
//! - `capacity`: fanout derivation from the encoding
//! - `store`: the [`BlockStore`] owning both files

mod block_file;
mod capacity;
mod constants;
mod store;
mod types;

pub use block_file::BlockFile;
pub use capacity::derive_capacity;
pub use constants::*;
pub use store::BlockStore;
pub use types::{
    BlockId, Capacity, FileMetadata, RecordId, SpatialError, SpatialResult, StoreStats,
};
