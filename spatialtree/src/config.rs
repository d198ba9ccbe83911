//! Store configuration module.
//!
//! This module provides the file locations and block geometry of a
//! [`BlockStore`](crate::BlockStore).

use std::path::{Path, PathBuf};

use crate::block_store::{
    SpatialError, SpatialResult, BLOCK_SIZE, DATA_FILE_NAME, INDEX_FILE_NAME, LENGTH_PREFIX_SIZE,
};

/// Default dimensionality: latitude/longitude points
pub const DEFAULT_DIMENSIONS: usize = 2;

/// Configuration of a block store.
///
/// # Example
///
/// ```rust
/// use spatialtree::StoreConfig;
///
/// let config = StoreConfig::new("/tmp/spatial")
///     .with_dimensions(3)
///     .with_block_size(4096);
/// assert_eq!(config.dimensions(), 3);
/// assert!(config.data_path().ends_with("datafile.dat"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    data_path: PathBuf,
    index_path: PathBuf,
    dimensions: usize,
    block_size: usize,
}

impl StoreConfig {
    /// Creates a configuration placing `datafile.dat` and `indexfile.dat` in `dir`.
    ///
    /// Defaults: 2 dimensions, 32KB blocks.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(DATA_FILE_NAME),
            index_path: dir.join(INDEX_FILE_NAME),
            dimensions: DEFAULT_DIMENSIONS,
            block_size: BLOCK_SIZE,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Overrides the data file location.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Overrides the index file location.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = path.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Overrides the block size. Small blocks are mostly useful in tests,
    /// where they force splits with few records.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Checks the configuration before any file is touched.
    ///
    /// Whether the block size yields a usable fanout is checked later, when
    /// the capacity is derived from the encoding.
    pub fn validate(&self) -> SpatialResult<()> {
        if self.dimensions == 0 {
            return Err(SpatialError::InvalidArgument(
                "the number of data dimensions must be a positive integer".into(),
            ));
        }
        if self.block_size <= LENGTH_PREFIX_SIZE || self.block_size > u32::MAX as usize {
            return Err(SpatialError::InvalidArgument(format!(
                "unsupported block size {}",
                self.block_size
            )));
        }
        if self.data_path == self.index_path {
            return Err(SpatialError::InvalidArgument(
                "data file and index file must be different files".into(),
            ));
        }
        Ok(())
    }
}
