//! Core types shared by the block store and the trees built on top of it:
//! - Error and result types
//! - Block and record identifiers
//! - File metadata layout
//! - Statistics structures

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while storing or querying the spatial index.
///
/// Every variant is fatal for the operation that produced it: nothing is
/// retried and multi-block mutations are not rolled back.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Short read on block {block_id}: expected {expected} bytes")]
    ShortRead { block_id: BlockId, expected: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt metadata: {0}")]
    CorruptMetadata(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<bincode::error::EncodeError> for SpatialError {
    fn from(err: bincode::error::EncodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for SpatialError {
    fn from(err: bincode::error::DecodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Block ID - position of a fixed-size block inside a file (`offset = id * block_size`)
pub type BlockId = u64;

/// Unique identifier of a stored record
pub type RecordId = u64;

// ============================================================================
// File Metadata
// ============================================================================

/// Metadata kept in block 0 of both files.
///
/// On disk this is the sequence `[dimensions, block_size, block_count]`,
/// followed by `tree_levels` for the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub dimensions: usize,
    pub block_size: usize,
    /// Number of blocks in the file, the metadata block included.
    pub block_count: u64,
    pub tree_levels: Option<u32>,
}

impl FileMetadata {
    pub fn for_data_file(dimensions: usize, block_size: usize) -> Self {
        Self {
            dimensions,
            block_size,
            block_count: 1,
            tree_levels: None,
        }
    }

    pub fn for_index_file(dimensions: usize, block_size: usize) -> Self {
        Self {
            dimensions,
            block_size,
            block_count: 1,
            tree_levels: Some(1),
        }
    }

    /// The id the next appended block will receive.
    pub fn next_block_id(&self) -> BlockId {
        self.block_count
    }

    pub(crate) fn to_sequence(self) -> Vec<u64> {
        let mut sequence = vec![
            self.dimensions as u64,
            self.block_size as u64,
            self.block_count,
        ];
        if let Some(levels) = self.tree_levels {
            sequence.push(u64::from(levels));
        }
        sequence
    }

    pub(crate) fn from_sequence(sequence: &[u64]) -> SpatialResult<Self> {
        let (dimensions, block_size, block_count, tree_levels) = match sequence {
            [d, b, c] => (*d, *b, *c, None),
            [d, b, c, l] => (*d, *b, *c, Some(*l)),
            other => {
                return Err(SpatialError::CorruptMetadata(format!(
                    "expected 3 or 4 metadata values, found {}",
                    other.len()
                )))
            }
        };

        if dimensions == 0 || block_size == 0 || block_count == 0 {
            return Err(SpatialError::CorruptMetadata(format!(
                "zero field in metadata {:?}",
                sequence
            )));
        }

        let tree_levels = match tree_levels {
            Some(levels) => Some(u32::try_from(levels).map_err(|_| {
                SpatialError::CorruptMetadata(format!("tree levels out of range: {}", levels))
            })?),
            None => None,
        };

        Ok(Self {
            dimensions: dimensions as usize,
            block_size: block_size as usize,
            block_count,
            tree_levels,
        })
    }
}

// ============================================================================
// Capacity
// ============================================================================

/// Fanout and packing limits derived from the block size and the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    /// Maximum entries a node block can hold (`M`).
    pub max_entries: usize,
    /// Minimum entries of a non-root node (`m`, 40% of `M`).
    pub min_entries: usize,
    /// Records per data block when names are empty; real batches are packed by size.
    pub max_records_per_block: usize,
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the block store
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub dimensions: usize,
    pub block_size: usize,
    pub data_blocks: u64,
    pub index_blocks: u64,
    pub tree_levels: u32,
    pub max_entries: usize,
    pub min_entries: usize,
    pub disk_reads: u64,
    pub disk_writes: u64,
}
