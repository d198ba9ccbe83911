//! Distance queries: k nearest neighbours by branch-and-bound, and all
//! entries within a radius.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::block_store::{BlockId, BlockStore, SpatialResult};
use crate::rtree::{Entry, LeafRef};

/// A leaf in the result heap, ordered by distance to the query point.
#[derive(Debug)]
struct Candidate {
    distance: f64,
    leaf: LeafRef,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.leaf.record_id.cmp(&other.leaf.record_id))
    }
}

/// Max-heap of the best `k` leaves found so far.
struct KnnSearch<'a> {
    store: &'a BlockStore,
    point: &'a [f64],
    k: usize,
    heap: BinaryHeap<Candidate>,
    /// Distance of the current k-th best, infinite until the heap is full.
    bound: f64,
}

impl KnnSearch<'_> {
    fn admits(&self, distance: f64) -> bool {
        self.heap.len() < self.k || distance <= self.bound
    }

    fn visit(&mut self, block_id: BlockId) -> SpatialResult<()> {
        let node = self.store.read_node(block_id)?;
        for (distance, entry) in sorted_by_distance(node.entries, self.point) {
            if !self.admits(distance) {
                break;
            }
            match entry.child_block_id() {
                Some(child) => self.visit(child)?,
                None => {
                    if let Some(leaf) = entry.to_leaf_ref() {
                        self.offer(Candidate { distance, leaf });
                    }
                }
            }
        }
        Ok(())
    }

    fn offer(&mut self, candidate: Candidate) {
        if self.heap.len() == self.k {
            self.heap.pop();
        }
        self.heap.push(candidate);
        if let Some(worst) = self.heap.peek() {
            self.bound = worst.distance;
        }
    }
}

fn sorted_by_distance(entries: Vec<Entry>, point: &[f64]) -> Vec<(f64, Entry)> {
    let mut scored: Vec<(f64, Entry)> = entries
        .into_iter()
        .map(|e| (e.bbox.find_min_distance_from_point(point), e))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
}

/// The `k` leaves nearest to `point`, nearest first.
///
/// Returns fewer than `k` leaves when the tree holds fewer, and none for `k == 0`.
pub fn knn(
    store: &BlockStore,
    root_block_id: BlockId,
    point: &[f64],
    k: usize,
) -> SpatialResult<Vec<LeafRef>> {
    Ok(knn_with_distances(store, root_block_id, point, k)?
        .into_iter()
        .map(|(leaf, _)| leaf)
        .collect())
}

/// Like [`knn`], paired with each leaf's distance to `point`.
pub fn knn_with_distances(
    store: &BlockStore,
    root_block_id: BlockId,
    point: &[f64],
    k: usize,
) -> SpatialResult<Vec<(LeafRef, f64)>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut search = KnnSearch {
        store,
        point,
        k,
        heap: BinaryHeap::with_capacity(k + 1),
        bound: f64::INFINITY,
    };
    search.visit(root_block_id)?;

    Ok(search
        .heap
        .into_sorted_vec()
        .into_iter()
        .map(|c| (c.leaf, c.distance))
        .collect())
}

/// Every leaf within `radius` of `point`, nearest first.
pub fn within_distance(
    store: &BlockStore,
    root_block_id: BlockId,
    point: &[f64],
    radius: f64,
) -> SpatialResult<Vec<(LeafRef, f64)>> {
    let mut found = Vec::new();
    collect_within(store, root_block_id, point, radius, &mut found)?;
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(found
        .into_iter()
        .map(|(distance, leaf)| (leaf, distance))
        .collect())
}

fn collect_within(
    store: &BlockStore,
    block_id: BlockId,
    point: &[f64],
    radius: f64,
    found: &mut Vec<(f64, LeafRef)>,
) -> SpatialResult<()> {
    let node = store.read_node(block_id)?;
    for entry in &node.entries {
        let distance = entry.bbox.find_min_distance_from_point(point);
        if distance > radius {
            continue;
        }
        match entry.child_block_id() {
            Some(child) => collect_within(store, child, point, radius, found)?,
            None => found.extend(entry.to_leaf_ref().map(|leaf| (distance, leaf))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::ROOT_BLOCK_ID;
    use crate::bounding_box::BoundingBox;
    use crate::config::StoreConfig;
    use crate::record::Record;
    use crate::rtree::RStarTree;
    use crate::spatial_index::SpatialIndex;
    use tempfile::tempdir;

    fn line_tree(dir: &std::path::Path, count: u64) -> RStarTree {
        let store = BlockStore::open(StoreConfig::new(dir).with_block_size(1024)).unwrap();
        store.create_data_file(&[], true).unwrap();
        let mut tree = RStarTree::create(store).unwrap();
        for i in 0..count {
            tree.insert(&Record::new(i, "", vec![i as f64, 0.0])).unwrap();
        }
        tree
    }

    #[test]
    fn test_candidate_ordering() {
        let leaf = |id| LeafRef {
            record_id: id,
            data_block_id: None,
            bbox: BoundingBox::from_point(&[0.0]).unwrap(),
        };
        let mut heap = BinaryHeap::new();
        heap.push(Candidate { distance: 2.0, leaf: leaf(1) });
        heap.push(Candidate { distance: 5.0, leaf: leaf(2) });
        heap.push(Candidate { distance: 1.0, leaf: leaf(3) });
        assert_eq!(heap.peek().unwrap().distance, 5.0);
        let order: Vec<u64> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| c.leaf.record_id)
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_knn_on_a_line() {
        let dir = tempdir().unwrap();
        let tree = line_tree(dir.path(), 200);
        let found = knn_with_distances(tree.store(), ROOT_BLOCK_ID, &[50.2, 0.0], 3).unwrap();
        let ids: Vec<u64> = found.iter().map(|(l, _)| l.record_id).collect();
        assert_eq!(ids, vec![50, 51, 49]);
        assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_knn_k_zero_and_k_too_large() {
        let dir = tempdir().unwrap();
        let tree = line_tree(dir.path(), 10);
        assert!(knn(tree.store(), ROOT_BLOCK_ID, &[0.0, 0.0], 0)
            .unwrap()
            .is_empty());
        assert_eq!(
            knn(tree.store(), ROOT_BLOCK_ID, &[0.0, 0.0], 50)
                .unwrap()
                .len(),
            10
        );
    }

    #[test]
    fn test_within_distance() {
        let dir = tempdir().unwrap();
        let tree = line_tree(dir.path(), 100);
        let found = within_distance(tree.store(), ROOT_BLOCK_ID, &[20.0, 3.0], 5.0).unwrap();
        let ids: Vec<u64> = found.iter().map(|(l, _)| l.record_id).collect();
        // sqrt(16 + 9) = 5 is still inside
        assert_eq!(ids[0], 20);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![16, 17, 18, 19, 20, 21, 22, 23, 24]);
        assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
