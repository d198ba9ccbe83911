//! The storage context shared by both trees.
//!
//! A [`BlockStore`] owns the data file (batches of [`Record`]) and the index
//! file (one [`Node`] per block), their metadata and the derived capacity.
//! Every node or record access goes to disk.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::block_file::{encode_payload, BlockFile};
use super::capacity::derive_capacity;
use super::constants::{LENGTH_PREFIX_SIZE, METADATA_BLOCK_ID, ROOT_BLOCK_ID};
use super::types::{
    BlockId, Capacity, FileMetadata, RecordId, SpatialError, SpatialResult, StoreStats,
};
use crate::config::StoreConfig;
use crate::record::Record;
use crate::rtree::Node;

#[derive(Default)]
struct IoCounters {
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

/// Block storage for records and tree nodes.
///
/// Opening a store touches no file contents; call
/// [`create_data_file`](Self::create_data_file) and
/// [`create_index_file`](Self::create_index_file) to initialise or adopt the
/// files, or [`open_existing`](Self::open_existing) to adopt both.
pub struct BlockStore {
    config: StoreConfig,
    capacity: Capacity,
    data: BlockFile,
    index: BlockFile,
    data_meta: RwLock<FileMetadata>,
    index_meta: RwLock<FileMetadata>,
    counters: IoCounters,
}

impl BlockStore {
    /// Validates `config`, derives the capacity and opens (or creates) both files.
    pub fn open(config: StoreConfig) -> SpatialResult<Self> {
        config.validate()?;
        let capacity = derive_capacity(config.dimensions(), config.block_size())?;

        for path in [config.data_path(), config.index_path()] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let data = BlockFile::open_or_create(config.data_path(), config.block_size())?;
        let index = BlockFile::open_or_create(config.index_path(), config.block_size())?;
        let data_meta = FileMetadata::for_data_file(config.dimensions(), config.block_size());
        let index_meta = FileMetadata::for_index_file(config.dimensions(), config.block_size());

        Ok(Self {
            config,
            capacity,
            data,
            index,
            data_meta: RwLock::new(data_meta),
            index_meta: RwLock::new(index_meta),
            counters: IoCounters::default(),
        })
    }

    /// Opens a store whose files were written earlier, adopting both metadata blocks.
    pub fn open_existing(config: StoreConfig) -> SpatialResult<Self> {
        let store = Self::open(config)?;
        for (file, name) in [(&store.data, "data"), (&store.index, "index")] {
            if file.len_bytes()? < store.block_size() as u64 {
                return Err(SpatialError::InvalidState(format!(
                    "no {} file at {}",
                    name,
                    file.path().display()
                )));
            }
        }
        store.create_data_file(&[], false)?;
        store.create_index_file(false)?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions()
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn max_entries(&self) -> usize {
        self.capacity.max_entries
    }

    pub fn min_entries(&self) -> usize {
        self.capacity.min_entries
    }

    // ========================================================================
    // Data file
    // ========================================================================

    /// Initialises the data file with `records`.
    ///
    /// With `reset == false` and a valid persisted metadata block, the file is
    /// adopted as is and `records` is ignored. Otherwise the file is truncated
    /// and the records are packed into consecutive blocks, each holding as
    /// many records as fit.
    pub fn create_data_file(&self, records: &[Record], reset: bool) -> SpatialResult<()> {
        if !reset {
            if let Some(meta) = self.load_metadata(&self.data, false)? {
                log::info!(
                    "adopting data file {} with {} blocks",
                    self.data.path().display(),
                    meta.block_count
                );
                *self.data_meta.write() = meta;
                return Ok(());
            }
        }

        for record in records {
            record.check_dimensions(self.dimensions())?;
        }

        self.data.truncate()?;
        let meta = FileMetadata::for_data_file(self.dimensions(), self.block_size());
        *self.data_meta.write() = meta;
        self.write_metadata(&self.data, meta)?;

        let budget = self.data.payload_capacity();
        let empty_len = encode_payload(&Vec::<Record>::new())?.len();
        let mut batch: Vec<Record> = Vec::new();
        let mut batch_len = empty_len;
        for record in records {
            let record_len = encode_payload(record)?.len();
            if empty_len + record_len > budget {
                return Err(self.oversized(record));
            }
            if batch_len + record_len > budget {
                self.append_data_block(&batch)?;
                batch.clear();
                batch_len = empty_len;
            }
            batch.push(record.clone());
            batch_len += record_len;
        }
        if !batch.is_empty() {
            self.append_data_block(&batch)?;
        }

        log::info!(
            "created data file {} with {} records in {} blocks",
            self.data.path().display(),
            records.len(),
            self.data_meta.read().block_count - 1
        );
        Ok(())
    }

    /// Reads the batch of records stored in data block `block_id`.
    pub fn read_records(&self, block_id: BlockId) -> SpatialResult<Vec<Record>> {
        let block_count = self.data_meta.read().block_count;
        if block_id == METADATA_BLOCK_ID || block_id >= block_count {
            return Err(SpatialError::InvalidArgument(format!(
                "data block {} out of range 1..{}",
                block_id, block_count
            )));
        }
        self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        self.data.read_block(block_id)
    }

    /// Ids of all data blocks holding records.
    pub fn data_block_ids(&self) -> Range<BlockId> {
        1..self.data_meta.read().block_count
    }

    /// Stores one more record, in the last data block when it still fits.
    ///
    /// Returns the data block the record was written to.
    pub fn append_record(&self, record: &Record) -> SpatialResult<BlockId> {
        record.check_dimensions(self.dimensions())?;

        let last = self.data_meta.read().block_count - 1;
        if last != METADATA_BLOCK_ID {
            let mut batch = self.read_records(last)?;
            batch.push(record.clone());
            if LENGTH_PREFIX_SIZE + encode_payload(&batch)?.len() <= self.block_size() {
                self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
                self.data.write_block(last, &batch)?;
                return Ok(last);
            }
        }

        let batch = vec![record.clone()];
        if LENGTH_PREFIX_SIZE + encode_payload(&batch)?.len() > self.block_size() {
            return Err(self.oversized(record));
        }
        self.append_data_block(&batch)
    }

    /// Looks a record up in the data block it was stored in.
    pub fn find_record(
        &self,
        block_id: BlockId,
        record_id: RecordId,
    ) -> SpatialResult<Option<Record>> {
        Ok(self
            .read_records(block_id)?
            .into_iter()
            .find(|r| r.id() == record_id))
    }

    /// Looks a record up by scanning every data block.
    pub fn find_record_by_scan(&self, record_id: RecordId) -> SpatialResult<Option<Record>> {
        for block_id in self.data_block_ids() {
            if let Some(record) = self.find_record(block_id, record_id)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Every stored record, paired with the block it lives in.
    pub fn read_all_records(&self) -> SpatialResult<Vec<(BlockId, Record)>> {
        let mut records = Vec::new();
        for block_id in self.data_block_ids() {
            records.extend(
                self.read_records(block_id)?
                    .into_iter()
                    .map(|record| (block_id, record)),
            );
        }
        Ok(records)
    }

    fn append_data_block(&self, batch: &[Record]) -> SpatialResult<BlockId> {
        let block_id = self.data_meta.read().next_block_id();
        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        self.data.write_block(block_id, batch)?;

        let meta = {
            let mut meta = self.data_meta.write();
            meta.block_count += 1;
            *meta
        };
        self.write_metadata(&self.data, meta)?;
        Ok(block_id)
    }

    fn oversized(&self, record: &Record) -> SpatialError {
        SpatialError::InvalidArgument(format!(
            "record {} does not fit a block of {} bytes",
            record.id(),
            self.block_size()
        ))
    }

    // ========================================================================
    // Index file
    // ========================================================================

    /// Initialises the index file.
    ///
    /// With `reset == false` and a valid persisted metadata block, the file is
    /// adopted. Otherwise it is truncated to its metadata block with a tree
    /// height of 1; the caller writes the first node.
    pub fn create_index_file(&self, reset: bool) -> SpatialResult<()> {
        if !reset {
            if let Some(meta) = self.load_metadata(&self.index, true)? {
                log::info!(
                    "adopting index file {} with {} blocks and {} levels",
                    self.index.path().display(),
                    meta.block_count,
                    meta.tree_levels.unwrap_or(1)
                );
                *self.index_meta.write() = meta;
                return Ok(());
            }
        }

        self.index.truncate()?;
        let meta = FileMetadata::for_index_file(self.dimensions(), self.block_size());
        *self.index_meta.write() = meta;
        self.write_metadata(&self.index, meta)?;
        log::info!("created index file {}", self.index.path().display());
        Ok(())
    }

    /// Reads the node stored in index block `block_id`.
    pub fn read_node(&self, block_id: BlockId) -> SpatialResult<Node> {
        let block_count = self.index_meta.read().block_count;
        if block_id == METADATA_BLOCK_ID || block_id >= block_count {
            return Err(SpatialError::InvalidArgument(format!(
                "index block {} out of range 1..{}",
                block_id, block_count
            )));
        }

        self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        let node: Node = self.index.read_block(block_id)?;
        if node.block_id != block_id {
            return Err(SpatialError::InvalidState(format!(
                "block {} holds node {}",
                block_id, node.block_id
            )));
        }
        Ok(node)
    }

    /// Writes `node` to a fresh block, assigning its block id.
    pub fn append_node(&self, node: &mut Node) -> SpatialResult<BlockId> {
        let block_id = self.index_meta.read().next_block_id();
        node.block_id = block_id;
        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        self.index.write_block(block_id, node)?;

        let meta = {
            let mut meta = self.index_meta.write();
            meta.block_count += 1;
            *meta
        };
        self.write_metadata(&self.index, meta)?;
        log::debug!("appended level {} node at block {}", node.level, block_id);
        Ok(block_id)
    }

    /// Rewrites `node` in its block.
    ///
    /// When the node is the fixed root and `tree_levels` differs from the
    /// persisted height, the metadata block is updated too.
    pub fn update_node(&self, node: &Node, tree_levels: u32) -> SpatialResult<()> {
        let block_count = self.index_meta.read().block_count;
        if node.block_id == METADATA_BLOCK_ID || node.block_id >= block_count {
            return Err(SpatialError::InvalidState(format!(
                "cannot update unallocated index block {}",
                node.block_id
            )));
        }

        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        self.index.write_block(node.block_id, node)?;

        if node.block_id == ROOT_BLOCK_ID && self.tree_levels() != tree_levels {
            self.set_tree_levels(tree_levels)?;
        }
        Ok(())
    }

    /// Height of the tree as persisted in the index metadata.
    pub fn tree_levels(&self) -> u32 {
        self.index_meta.read().tree_levels.unwrap_or(1)
    }

    /// Persists a new tree height.
    pub fn set_tree_levels(&self, tree_levels: u32) -> SpatialResult<()> {
        let meta = {
            let mut meta = self.index_meta.write();
            meta.tree_levels = Some(tree_levels);
            *meta
        };
        log::debug!("tree height is now {}", tree_levels);
        self.write_metadata(&self.index, meta)
    }

    /// Number of blocks in the index file, the metadata block included.
    pub fn index_block_count(&self) -> u64 {
        self.index_meta.read().block_count
    }

    /// Number of blocks in the data file, the metadata block included.
    pub fn data_block_count(&self) -> u64 {
        self.data_meta.read().block_count
    }

    // ========================================================================
    // Metadata and maintenance
    // ========================================================================

    fn load_metadata(
        &self,
        file: &BlockFile,
        is_index: bool,
    ) -> SpatialResult<Option<FileMetadata>> {
        if file.len_bytes()? < self.block_size() as u64 {
            return Ok(None);
        }

        self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        let sequence: Vec<u64> = file.read_block(METADATA_BLOCK_ID)?;
        let meta = FileMetadata::from_sequence(&sequence)?;

        if meta.tree_levels.is_some() != is_index {
            return Err(SpatialError::CorruptMetadata(format!(
                "{} does not hold {} file metadata",
                file.path().display(),
                if is_index { "index" } else { "data" }
            )));
        }
        if meta.dimensions != self.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimensions(),
                actual: meta.dimensions,
            });
        }
        if meta.block_size != self.block_size() {
            return Err(SpatialError::InvalidArgument(format!(
                "{} was written with block size {}, configured {}",
                file.path().display(),
                meta.block_size,
                self.block_size()
            )));
        }
        if file.len_bytes()? < meta.block_count * self.block_size() as u64 {
            log::warn!(
                "{} is shorter than its {} recorded blocks",
                file.path().display(),
                meta.block_count
            );
        }
        Ok(Some(meta))
    }

    fn write_metadata(&self, file: &BlockFile, meta: FileMetadata) -> SpatialResult<()> {
        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        file.write_block(METADATA_BLOCK_ID, &meta.to_sequence())
    }

    /// Snapshot of the store's sizes and I/O counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            dimensions: self.dimensions(),
            block_size: self.block_size(),
            data_blocks: self.data_block_count() - 1,
            index_blocks: self.index_block_count() - 1,
            tree_levels: self.tree_levels(),
            max_entries: self.capacity.max_entries,
            min_entries: self.capacity.min_entries,
            disk_reads: self.counters.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.counters.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Flushes both files to disk.
    pub fn sync(&self) -> SpatialResult<()> {
        self.data.sync()?;
        self.index.sync()
    }
}
