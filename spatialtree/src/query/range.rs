//! Bounding-box range queries.

use crate::block_store::{BlockId, BlockStore, SpatialResult};
use crate::bounding_box::BoundingBox;
use crate::rtree::LeafRef;

/// Every leaf entry whose box overlaps `bbox`, in traversal order.
pub fn range_query(
    store: &BlockStore,
    root_block_id: BlockId,
    bbox: &BoundingBox,
) -> SpatialResult<Vec<LeafRef>> {
    let mut results = Vec::new();
    collect_overlapping(store, root_block_id, bbox, &mut results)?;
    Ok(results)
}

pub(crate) fn collect_overlapping(
    store: &BlockStore,
    block_id: BlockId,
    bbox: &BoundingBox,
    results: &mut Vec<LeafRef>,
) -> SpatialResult<()> {
    let node = store.read_node(block_id)?;
    for entry in node.entries.iter().filter(|e| e.bbox.overlaps(bbox)) {
        match entry.child_block_id() {
            Some(child) => collect_overlapping(store, child, bbox, results)?,
            None => results.extend(entry.to_leaf_ref()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::ROOT_BLOCK_ID;
    use crate::config::StoreConfig;
    use crate::record::Record;
    use crate::rtree::RStarTree;
    use crate::spatial_index::SpatialIndex;
    use tempfile::tempdir;

    #[test]
    fn test_range_query_on_empty_tree() {
        let dir = tempdir().unwrap();
        let store = BlockStore::open(StoreConfig::new(dir.path())).unwrap();
        store.create_data_file(&[], true).unwrap();
        let tree = RStarTree::create(store).unwrap();
        let bbox = BoundingBox::from_ranges(&[(0.0, 1.0), (0.0, 1.0)]).unwrap();
        assert!(range_query(tree.store(), ROOT_BLOCK_ID, &bbox)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_range_query_includes_border() {
        let dir = tempdir().unwrap();
        let store = BlockStore::open(StoreConfig::new(dir.path()).with_block_size(1024)).unwrap();
        store.create_data_file(&[], true).unwrap();
        let mut tree = RStarTree::create(store).unwrap();
        for i in 0..100u64 {
            tree.insert(&Record::new(i, "", vec![(i % 10) as f64, (i / 10) as f64]))
                .unwrap();
        }

        let bbox = BoundingBox::from_ranges(&[(2.0, 4.0), (3.0, 3.0)]).unwrap();
        let mut ids: Vec<u64> = range_query(tree.store(), ROOT_BLOCK_ID, &bbox)
            .unwrap()
            .into_iter()
            .map(|l| l.record_id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![32, 33, 34]);
    }
}
