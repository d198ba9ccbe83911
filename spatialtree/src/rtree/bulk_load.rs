//! One-shot bottom-up construction from the data file.
//!
//! Records are sorted by their first coordinate and packed into full leaves;
//! the leaves are packed into full parents, level by level, until a single
//! root remains. This approximates Sort-Tile-Recursive loading with a single
//! sort axis.

use crate::block_store::{BlockId, BlockStore, SpatialError, SpatialResult, LEAF_LEVEL};
use crate::spatial_index::SpatialIndex;

use super::delete::delete_entry;
use super::entry::Entry;
use super::node::Node;

/// An R*-tree built in one pass from the stored records.
///
/// Its leaves do not record the data block of each record, so resolving a
/// query result scans the data file. It is not meant to receive further
/// insertions.
pub struct BulkLoadedRStarTree {
    store: BlockStore,
    root_block_id: BlockId,
    total_levels: u32,
}

impl BulkLoadedRStarTree {
    /// Resets the index file and builds the tree from every stored record.
    pub fn build(store: BlockStore) -> SpatialResult<Self> {
        store.create_index_file(true)?;

        let mut records: Vec<_> = store
            .read_all_records()?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| {
            let ka = a.coordinate(0).unwrap_or(f64::NEG_INFINITY);
            let kb = b.coordinate(0).unwrap_or(f64::NEG_INFINITY);
            ka.total_cmp(&kb)
        });

        let max_entries = store.max_entries();
        if records.is_empty() {
            let mut root = Node::empty_leaf(0);
            let root_block_id = store.append_node(&mut root)?;
            return Ok(Self {
                store,
                root_block_id,
                total_levels: LEAF_LEVEL,
            });
        }

        let leaf_entries = records
            .iter()
            .map(|record| Entry::for_record(record, None))
            .collect::<SpatialResult<Vec<_>>>()?;

        let mut level = LEAF_LEVEL;
        let mut current = pack_level(&store, level, leaf_entries, max_entries)?;
        while current.len() > 1 {
            level += 1;
            store.set_tree_levels(level)?;
            current = pack_level(&store, level, current, max_entries)?;
        }

        let root_block_id = current
            .first()
            .and_then(Entry::child_block_id)
            .ok_or_else(|| SpatialError::InvalidState("bulk load produced no root".into()))?;

        log::info!(
            "bulk loaded {} records into {} levels, root at block {}",
            records.len(),
            level,
            root_block_id
        );
        Ok(Self {
            store,
            root_block_id,
            total_levels: level,
        })
    }

    /// Adopts an index written by [`build`](Self::build).
    ///
    /// The root is the last block of the index file since it is always
    /// written last.
    pub fn open(store: BlockStore) -> SpatialResult<Self> {
        store.create_index_file(false)?;
        let block_count = store.index_block_count();
        if block_count < 2 {
            return Err(SpatialError::InvalidState(
                "index file holds no root node".into(),
            ));
        }

        let root_block_id = block_count - 1;
        let total_levels = store.tree_levels();
        let root = store.read_node(root_block_id)?;
        if root.level != total_levels {
            return Err(SpatialError::CorruptMetadata(format!(
                "last block is at level {} but the metadata records {} levels",
                root.level, total_levels
            )));
        }
        Ok(Self {
            store,
            root_block_id,
            total_levels,
        })
    }

    /// Consumes the tree, handing back its store.
    pub fn into_store(self) -> BlockStore {
        self.store
    }
}

/// Packs `entries` in order into full nodes of `level`, persisting each one,
/// and returns the parent entries pointing at them.
fn pack_level(
    store: &BlockStore,
    level: u32,
    entries: Vec<Entry>,
    max_entries: usize,
) -> SpatialResult<Vec<Entry>> {
    let mut parents = Vec::with_capacity(entries.len().div_ceil(max_entries));
    for chunk in entries.chunks(max_entries) {
        let mut node = Node::new(level, 0, chunk.to_vec());
        let block_id = store.append_node(&mut node)?;
        let mbr = node
            .mbr()
            .ok_or_else(|| SpatialError::InvalidState("packed an empty node".into()))?;
        parents.push(Entry::internal(mbr, block_id));
    }
    log::debug!("packed {} nodes at level {}", parents.len(), level);
    Ok(parents)
}

impl SpatialIndex for BulkLoadedRStarTree {
    fn store(&self) -> &BlockStore {
        &self.store
    }

    fn root_block_id(&self) -> BlockId {
        self.root_block_id
    }

    fn total_levels(&self) -> u32 {
        self.total_levels
    }

    fn delete(&mut self, entry: &Entry) -> SpatialResult<bool> {
        delete_entry(&self.store, self.root_block_id, self.total_levels, entry)
    }
}
