//! The incremental R*-tree.
//!
//! The root always lives in [`ROOT_BLOCK_ID`]. Insertion descends from the
//! root, places the entry at its target level, then walks back up setting
//! every parent entry to the exact MBR of its child. Overflowing nodes are
//! handled once per level with forced reinsertion and split afterwards.

use std::collections::VecDeque;

use crate::block_store::{
    BlockId, BlockStore, SpatialError, SpatialResult, CHOOSE_SUBTREE_P, LEAF_LEVEL,
    REINSERT_FACTOR, ROOT_BLOCK_ID,
};
use crate::bounding_box::BoundingBox;
use crate::record::Record;
use crate::spatial_index::SpatialIndex;

use super::delete::delete_entry;
use super::entry::Entry;
use super::node::Node;
use super::split::split_entries;

/// State shared by one top-level insertion and the reinsertions it causes.
struct InsertContext {
    /// `overflowed[level]` is set once overflow was treated at that level.
    overflowed: Vec<bool>,
    /// Entries removed by forced reinsertion, with the level they go back to.
    pending: VecDeque<(Entry, u32)>,
}

impl InsertContext {
    fn new(total_levels: u32) -> Self {
        Self {
            overflowed: vec![false; total_levels as usize + 1],
            pending: VecDeque::new(),
        }
    }

    /// Marks `level` as handled, returning whether it already was.
    fn mark_overflow(&mut self, level: u32) -> bool {
        let index = level as usize;
        if index >= self.overflowed.len() {
            self.overflowed.resize(index + 1, false);
        }
        std::mem::replace(&mut self.overflowed[index], true)
    }
}

/// What a node reports to its parent after an insertion below it.
struct InsertOutcome {
    /// The node's MBR after the insertion (the retained half after a split).
    mbr: BoundingBox,
    /// Entry for the new sibling produced by a split.
    sibling: Option<Entry>,
}

/// A disk-resident R*-tree built by incremental insertion.
///
/// # Examples
///
/// ```rust,no_run
/// use spatialtree::{BlockStore, BoundingBox, RStarTree, Record, SpatialIndex, StoreConfig};
///
/// let store = BlockStore::open(StoreConfig::new("/tmp/places"))?;
/// store.create_data_file(&[], true)?;
/// let mut tree = RStarTree::create(store)?;
///
/// tree.insert(&Record::new(1, "Limassol", vec![34.7, 33.0]))?;
/// tree.insert(&Record::new(2, "Paphos", vec![34.8, 32.4]))?;
///
/// let area = BoundingBox::from_ranges(&[(34.0, 35.0), (32.9, 33.1)])?;
/// let found = tree.range_query(&area)?;
/// assert_eq!(found.len(), 1);
/// # Ok::<(), spatialtree::SpatialError>(())
/// ```
pub struct RStarTree {
    store: BlockStore,
    total_levels: u32,
}

impl RStarTree {
    /// Resets the index file to a single empty root leaf.
    pub fn create(store: BlockStore) -> SpatialResult<Self> {
        store.create_index_file(true)?;
        let mut root = Node::empty_leaf(ROOT_BLOCK_ID);
        let block_id = store.append_node(&mut root)?;
        if block_id != ROOT_BLOCK_ID {
            return Err(SpatialError::InvalidState(format!(
                "root written to block {} instead of {}",
                block_id, ROOT_BLOCK_ID
            )));
        }
        Ok(Self {
            store,
            total_levels: 1,
        })
    }

    /// Adopts an index written earlier by an [`RStarTree`].
    pub fn open(store: BlockStore) -> SpatialResult<Self> {
        store.create_index_file(false)?;
        if store.index_block_count() <= ROOT_BLOCK_ID {
            return Err(SpatialError::InvalidState(
                "index file holds no root node".into(),
            ));
        }

        let total_levels = store.tree_levels();
        let root = store.read_node(ROOT_BLOCK_ID)?;
        if root.level != total_levels {
            return Err(SpatialError::CorruptMetadata(format!(
                "root is at level {} but the metadata records {} levels",
                root.level, total_levels
            )));
        }
        log::info!("opened R*-tree with {} levels", total_levels);
        Ok(Self {
            store,
            total_levels,
        })
    }

    /// Resets the index and inserts every record of the data file.
    pub fn build_from_data_file(store: BlockStore) -> SpatialResult<Self> {
        let mut tree = Self::create(store)?;
        let records = tree.store.read_all_records()?;
        let count = records.len();
        for (block_id, record) in records {
            tree.insert_entry(Entry::for_record(&record, Some(block_id))?)?;
        }
        log::info!(
            "indexed {} records into {} levels",
            count,
            tree.total_levels
        );
        Ok(tree)
    }

    /// Stores `record` in the data file and indexes it.
    pub fn insert(&mut self, record: &Record) -> SpatialResult<()> {
        let block_id = self.store.append_record(record)?;
        self.insert_entry(Entry::for_record(record, Some(block_id))?)
    }

    /// Indexes a leaf entry for a record that is already stored.
    pub fn insert_entry(&mut self, entry: Entry) -> SpatialResult<()> {
        if !entry.is_leaf() {
            return Err(SpatialError::InvalidArgument(
                "only leaf entries can be inserted".into(),
            ));
        }
        if entry.bbox.dimensions() != self.store.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: self.store.dimensions(),
                actual: entry.bbox.dimensions(),
            });
        }

        let mut ctx = InsertContext::new(self.total_levels);
        self.insert_from_root(entry, LEAF_LEVEL, &mut ctx)?;
        while let Some((entry, level)) = ctx.pending.pop_front() {
            self.insert_from_root(entry, level, &mut ctx)?;
        }
        Ok(())
    }

    /// Consumes the tree, handing back its store.
    pub fn into_store(self) -> BlockStore {
        self.store
    }

    fn insert_from_root(
        &mut self,
        entry: Entry,
        level: u32,
        ctx: &mut InsertContext,
    ) -> SpatialResult<()> {
        if level > self.total_levels {
            return Err(SpatialError::InvalidState(format!(
                "cannot insert at level {} into a tree of {} levels",
                level, self.total_levels
            )));
        }
        let outcome = self.insert_into(ROOT_BLOCK_ID, entry, level, ctx)?;
        if outcome.sibling.is_some() {
            return Err(SpatialError::InvalidState(
                "root split escaped the root".into(),
            ));
        }
        Ok(())
    }

    fn insert_into(
        &mut self,
        block_id: BlockId,
        entry: Entry,
        level: u32,
        ctx: &mut InsertContext,
    ) -> SpatialResult<InsertOutcome> {
        let mut node = self.store.read_node(block_id)?;

        if node.level == level {
            if entry.is_leaf() != node.is_leaf() {
                return Err(SpatialError::InvalidState(format!(
                    "entry kind does not match level {} of block {}",
                    node.level, node.block_id
                )));
            }
            node.entries.push(entry);
        } else {
            let index = self.choose_subtree(&node, &entry.bbox, level)?;
            let child_block_id = node.entries[index].child_block_id().ok_or_else(|| {
                SpatialError::InvalidState(format!(
                    "leaf entry in level {} node {}",
                    node.level, node.block_id
                ))
            })?;

            let outcome = self.insert_into(child_block_id, entry, level, ctx)?;
            node.entries[index].bbox = outcome.mbr;
            if let Some(sibling) = outcome.sibling {
                node.entries.push(sibling);
            }
        }

        if node.len() > self.store.max_entries() {
            return self.overflow_treatment(node, ctx);
        }

        self.store.update_node(&node, self.total_levels)?;
        Ok(InsertOutcome {
            mbr: node_mbr(&node)?,
            sibling: None,
        })
    }

    /// Picks the entry of `node` to descend into for a box headed to `target_level`.
    fn choose_subtree(
        &self,
        node: &Node,
        bbox: &BoundingBox,
        target_level: u32,
    ) -> SpatialResult<usize> {
        if node.is_empty() {
            return Err(SpatialError::InvalidState(format!(
                "empty internal node {}",
                node.block_id
            )));
        }

        let enlargements: Vec<f64> = node
            .entries
            .iter()
            .map(|e| e.bbox.enlargement(bbox))
            .collect();

        if node.level != target_level + 1 {
            return Ok(argmin(0..node.len(), |i| {
                (enlargements[i], node.entries[i].bbox.area(), 0.0)
            }));
        }

        let mut candidates: Vec<usize> = (0..node.len()).collect();
        let max_entries = self.store.max_entries();
        if max_entries > (CHOOSE_SUBTREE_P * 2) / 3 && node.len() > CHOOSE_SUBTREE_P {
            candidates.sort_by(|&a, &b| enlargements[a].total_cmp(&enlargements[b]));
            candidates.truncate(CHOOSE_SUBTREE_P);
        }

        Ok(argmin(candidates, |i| {
            (
                overlap_enlargement(node, i, bbox),
                enlargements[i],
                node.entries[i].bbox.area(),
            )
        }))
    }

    fn overflow_treatment(
        &mut self,
        node: Node,
        ctx: &mut InsertContext,
    ) -> SpatialResult<InsertOutcome> {
        if node.block_id != ROOT_BLOCK_ID && !ctx.mark_overflow(node.level) {
            return self.reinsert(node, ctx);
        }
        self.split(node)
    }

    /// Forced reinsertion: keeps the entries closest to the node's centre and
    /// queues the farthest ones for insertion from the root.
    fn reinsert(&mut self, mut node: Node, ctx: &mut InsertContext) -> SpatialResult<InsertOutcome> {
        let max_entries = self.store.max_entries();
        if node.len() != max_entries + 1 {
            return Err(SpatialError::InvalidState(format!(
                "reinsertion needs {} entries, node {} holds {}",
                max_entries + 1,
                node.block_id,
                node.len()
            )));
        }

        let center = node_mbr(&node)?;
        node.entries.sort_by(|a, b| {
            let da = BoundingBox::find_distance_between_bounding_boxes(&a.bbox, &center);
            let db = BoundingBox::find_distance_between_bounding_boxes(&b.bbox, &center);
            da.total_cmp(&db)
        });

        let count = ((REINSERT_FACTOR * max_entries as f64) as usize).max(1);
        let keep = node.len() - count;
        let removed = node.entries.split_off(keep);

        self.store.update_node(&node, self.total_levels)?;
        log::debug!(
            "reinserting {} entries of level {} node {}",
            removed.len(),
            node.level,
            node.block_id
        );
        ctx.pending
            .extend(removed.into_iter().map(|entry| (entry, node.level)));

        Ok(InsertOutcome {
            mbr: node_mbr(&node)?,
            sibling: None,
        })
    }

    fn split(&mut self, mut node: Node) -> SpatialResult<InsertOutcome> {
        let entries = std::mem::take(&mut node.entries);
        let (first, second) = split_entries(entries, self.store.min_entries())?;

        if node.block_id == ROOT_BLOCK_ID {
            let mut left = Node::new(node.level, 0, first);
            let mut right = Node::new(node.level, 0, second);
            self.store.append_node(&mut left)?;
            self.store.append_node(&mut right)?;

            self.total_levels += 1;
            let root = Node::new(
                node.level + 1,
                ROOT_BLOCK_ID,
                vec![
                    Entry::internal(node_mbr(&left)?, left.block_id),
                    Entry::internal(node_mbr(&right)?, right.block_id),
                ],
            );
            self.store.update_node(&root, self.total_levels)?;
            log::debug!("root split, tree height is now {}", self.total_levels);
            return Ok(InsertOutcome {
                mbr: node_mbr(&root)?,
                sibling: None,
            });
        }

        node.entries = first;
        self.store.update_node(&node, self.total_levels)?;

        let mut sibling = Node::new(node.level, 0, second);
        self.store.append_node(&mut sibling)?;
        Ok(InsertOutcome {
            mbr: node_mbr(&node)?,
            sibling: Some(Entry::internal(node_mbr(&sibling)?, sibling.block_id)),
        })
    }
}

impl SpatialIndex for RStarTree {
    fn store(&self) -> &BlockStore {
        &self.store
    }

    fn root_block_id(&self) -> BlockId {
        ROOT_BLOCK_ID
    }

    fn total_levels(&self) -> u32 {
        self.total_levels
    }

    fn delete(&mut self, entry: &Entry) -> SpatialResult<bool> {
        delete_entry(&self.store, ROOT_BLOCK_ID, self.total_levels, entry)
    }
}

fn node_mbr(node: &Node) -> SpatialResult<BoundingBox> {
    node.mbr().ok_or_else(|| {
        SpatialError::InvalidState(format!("node {} has no entries", node.block_id))
    })
}

/// Growth of the overlap between entry `index` and its siblings if it had to
/// cover `bbox` as well.
fn overlap_enlargement(node: &Node, index: usize, bbox: &BoundingBox) -> f64 {
    let current = &node.entries[index].bbox;
    let enlarged = current.union(bbox);
    node.entries
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .map(|(_, e)| {
            BoundingBox::calculate_overlap_value(&enlarged, &e.bbox)
                - BoundingBox::calculate_overlap_value(current, &e.bbox)
        })
        .sum()
}

/// First index with the lexicographically smallest key.
fn argmin<I, F>(indices: I, key: F) -> usize
where
    I: IntoIterator<Item = usize>,
    F: Fn(usize) -> (f64, f64, f64),
{
    let mut best: Option<(usize, (f64, f64, f64))> = None;
    for index in indices {
        let k = key(index);
        let better = match &best {
            None => true,
            Some((_, b)) => {
                k.0 < b.0 || (k.0 == b.0 && (k.1 < b.1 || (k.1 == b.1 && k.2 < b.2)))
            }
        };
        if better {
            best = Some((index, k));
        }
    }
    best.map(|(index, _)| index).unwrap_or(0)
}
