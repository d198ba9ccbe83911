//! Leaf-entry removal shared by both trees.
//!
//! Removal never rebalances: an underfull leaf is only reported, and the
//! ancestors keep their (possibly loose) bounding boxes.

use crate::block_store::{BlockId, BlockStore, SpatialError, SpatialResult, UNDERFLOW_FACTOR};
use crate::bounding_box::BoundingBox;

use super::entry::Entry;
use super::node::Node;

/// Descends through children overlapping `bbox` and returns the first leaf
/// holding an entry that overlaps it.
///
/// The leaf found is not necessarily the one holding a given record when
/// sibling boxes overlap.
pub fn find_leaf(
    store: &BlockStore,
    block_id: BlockId,
    bbox: &BoundingBox,
) -> SpatialResult<Option<Node>> {
    let node = store.read_node(block_id)?;
    if node.is_leaf() {
        let hit = node.entries.iter().any(|e| e.bbox.overlaps(bbox));
        return Ok(hit.then_some(node));
    }

    for entry in node.entries.iter().filter(|e| e.bbox.overlaps(bbox)) {
        if let Some(child) = entry.child_block_id() {
            if let Some(leaf) = find_leaf(store, child, bbox)? {
                return Ok(Some(leaf));
            }
        }
    }
    Ok(None)
}

/// Removes the leaf entry of the same record as `entry`.
///
/// Returns `false` when the record was not found in the leaf reached by
/// [`find_leaf`], or when no leaf was reached at all.
pub fn delete_entry(
    store: &BlockStore,
    root_block_id: BlockId,
    total_levels: u32,
    entry: &Entry,
) -> SpatialResult<bool> {
    if !entry.is_leaf() {
        return Err(SpatialError::InvalidArgument(
            "only leaf entries can be deleted".into(),
        ));
    }
    if entry.bbox.dimensions() != store.dimensions() {
        return Err(SpatialError::DimensionMismatch {
            expected: store.dimensions(),
            actual: entry.bbox.dimensions(),
        });
    }

    let Some(mut leaf) = find_leaf(store, root_block_id, &entry.bbox)? else {
        return Ok(false);
    };
    let Some(position) = leaf
        .entries
        .iter()
        .position(|e| e.refers_to_same_record(entry))
    else {
        return Ok(false);
    };

    leaf.entries.remove(position);
    store.update_node(&leaf, total_levels)?;

    if leaf.block_id != root_block_id && is_underfull(leaf.len(), store.max_entries()) {
        log::warn!(
            "leaf {} underflows with {} entries after delete; it is not rebalanced",
            leaf.block_id,
            leaf.len()
        );
    }
    Ok(true)
}

fn is_underfull(len: usize, max_entries: usize) -> bool {
    (len as f64) < UNDERFLOW_FACTOR * max_entries as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::record::Record;
    use crate::rtree::RStarTree;
    use crate::spatial_index::SpatialIndex;
    use tempfile::tempdir;

    fn tree_with(dir: &std::path::Path, count: u64) -> RStarTree {
        let store = BlockStore::open(StoreConfig::new(dir).with_block_size(1024)).unwrap();
        store.create_data_file(&[], true).unwrap();
        let mut tree = RStarTree::create(store).unwrap();
        for i in 0..count {
            tree.insert(&Record::new(i, "", vec![i as f64, (i * i % 97) as f64]))
                .unwrap();
        }
        tree
    }

    #[test]
    fn test_delete_from_root_leaf() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(dir.path(), 3);
        let record = Record::new(1, "", vec![1.0, 1.0]);
        assert!(tree.delete_record(&record).unwrap());
        assert!(!tree.delete_record(&record).unwrap());

        let everything = BoundingBox::from_ranges(&[(-10.0, 100.0), (-10.0, 100.0)]).unwrap();
        let mut ids: Vec<u64> = tree
            .range_query(&everything)
            .unwrap()
            .iter()
            .map(|l| l.record_id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(dir.path(), 50);
        let far = Record::new(7, "", vec![1000.0, 1000.0]);
        assert!(!tree.delete_record(&far).unwrap());

        let same_place_other_id = Record::new(500, "", vec![7.0, 49.0]);
        assert!(!tree.delete_record(&same_place_other_id).unwrap());
    }

    #[test]
    fn test_delete_in_deep_tree() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(dir.path(), 300);
        assert!(tree.total_levels() >= 2);

        let record = Record::new(150, "", vec![150.0, (150 * 150 % 97) as f64]);
        assert!(tree.delete_record(&record).unwrap());
        let hits = tree.range_query(&record.bounding_box().unwrap()).unwrap();
        assert!(hits.iter().all(|l| l.record_id != 150));

        let report = tree.check_integrity().unwrap();
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.leaf_entries, 299);
    }

    #[test]
    fn test_underfull_threshold_is_not_truncated() {
        // 0.3 * 536 = 160.8
        assert!(is_underfull(160, 536));
        assert!(!is_underfull(161, 536));
        // 0.3 * 16 = 4.8
        assert!(is_underfull(4, 16));
        assert!(!is_underfull(5, 16));
        assert!(!is_underfull(0, 0));
    }

    #[test]
    fn test_delete_leaf_from_query_result() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(dir.path(), 120);

        let nearest = tree.knn(&[40.0, 0.0], 3).unwrap();
        for leaf in &nearest {
            assert!(tree.delete_leaf(leaf).unwrap());
            assert!(!tree.delete_leaf(leaf).unwrap());
        }

        let remaining = tree.knn(&[40.0, 0.0], 120).unwrap();
        assert_eq!(remaining.len(), 117);
        assert!(remaining
            .iter()
            .all(|l| nearest.iter().all(|n| n.record_id != l.record_id)));
    }

    #[test]
    fn test_delete_rejects_internal_entries() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(dir.path(), 1);
        let entry = Entry::internal(BoundingBox::from_point(&[0.0, 0.0]).unwrap(), 1);
        assert!(matches!(
            tree.delete(&entry),
            Err(SpatialError::InvalidArgument(_))
        ));
    }
}
