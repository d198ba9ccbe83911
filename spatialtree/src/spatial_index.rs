//! The query surface shared by both trees.

use crate::block_store::{BlockId, BlockStore, SpatialError, SpatialResult};
use crate::bounding_box::BoundingBox;
use crate::query;
use crate::record::Record;
use crate::rtree::{check_tree, Entry, IntegrityReport, LeafRef};

/// A persisted R*-tree that can be queried and pruned.
///
/// Implementors provide their store, where their root lives and how tall
/// they are; the queries come for free.
pub trait SpatialIndex {
    /// The block store holding the tree and its records.
    fn store(&self) -> &BlockStore;

    /// Block of the root node.
    fn root_block_id(&self) -> BlockId;

    /// Number of levels, 1 for a tree made of a single leaf.
    fn total_levels(&self) -> u32;

    /// Removes the leaf entry of the same record as `entry`.
    ///
    /// Returns `false` when the record could not be found. Underfull leaves
    /// are left as they are.
    fn delete(&mut self, entry: &Entry) -> SpatialResult<bool>;

    /// Removes the index entry of `record`. The stored record stays in the
    /// data file.
    fn delete_record(&mut self, record: &Record) -> SpatialResult<bool> {
        let entry = Entry::for_record(record, None)?;
        self.delete(&entry)
    }

    /// Removes a leaf previously returned by a query.
    fn delete_leaf(&mut self, leaf: &LeafRef) -> SpatialResult<bool> {
        self.delete(&leaf.to_entry())
    }

    /// Leaves whose box overlaps `bbox`, unordered.
    fn range_query(&self, bbox: &BoundingBox) -> SpatialResult<Vec<LeafRef>> {
        check_dimensions(self.store(), bbox.dimensions())?;
        query::range_query(self.store(), self.root_block_id(), bbox)
    }

    /// The `k` leaves nearest to `point`, nearest first.
    fn knn(&self, point: &[f64], k: usize) -> SpatialResult<Vec<LeafRef>> {
        check_dimensions(self.store(), point.len())?;
        query::knn(self.store(), self.root_block_id(), point, k)
    }

    /// Leaves overlapping `bbox` that no other such leaf dominates, with
    /// smaller coordinates preferred in every dimension.
    fn skyline(&self, bbox: &BoundingBox) -> SpatialResult<Vec<LeafRef>> {
        check_dimensions(self.store(), bbox.dimensions())?;
        query::skyline(self.store(), self.root_block_id(), bbox)
    }

    /// Leaves within `radius` of `point` with their distances, nearest first.
    fn within_distance(&self, point: &[f64], radius: f64) -> SpatialResult<Vec<(LeafRef, f64)>> {
        check_dimensions(self.store(), point.len())?;
        if radius.is_nan() || radius < 0.0 {
            return Err(SpatialError::InvalidArgument(format!(
                "radius must be a non-negative number, got {}",
                radius
            )));
        }
        query::within_distance(self.store(), self.root_block_id(), point, radius)
    }

    /// Loads the record a leaf points at.
    ///
    /// Leaves that know their data block are resolved with one read; the
    /// others scan the data file.
    fn resolve(&self, leaf: &LeafRef) -> SpatialResult<Option<Record>> {
        match leaf.data_block_id {
            Some(block_id) => self.store().find_record(block_id, leaf.record_id),
            None => self.store().find_record_by_scan(leaf.record_id),
        }
    }

    /// Walks the whole tree and reports violated invariants.
    fn check_integrity(&self) -> SpatialResult<IntegrityReport> {
        Ok(check_tree(
            self.store(),
            self.root_block_id(),
            self.total_levels(),
        ))
    }
}

fn check_dimensions(store: &BlockStore, actual: usize) -> SpatialResult<()> {
    if actual != store.dimensions() {
        return Err(SpatialError::DimensionMismatch {
            expected: store.dimensions(),
            actual,
        });
    }
    Ok(())
}
