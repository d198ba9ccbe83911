//! Skyline queries over the lower corners of the entries in a region.
//!
//! Candidates are collected with the range traversal, then filtered pairwise,
//! which is quadratic in the number of candidates.

use crate::block_store::{BlockId, BlockStore, SpatialResult};
use crate::bounding_box::BoundingBox;
use crate::rtree::LeafRef;

use super::range::collect_overlapping;

/// Whether `a` dominates `b`: no larger lower bound in any dimension and a
/// strictly smaller one in at least one.
pub fn dominates(a: &BoundingBox, b: &BoundingBox) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.bounds().iter().zip(b.bounds()) {
        if x.lower() > y.lower() {
            return false;
        }
        if x.lower() < y.lower() {
            strictly_better = true;
        }
    }
    strictly_better
}

/// The leaves overlapping `bbox` that no other such leaf dominates.
pub fn skyline(
    store: &BlockStore,
    root_block_id: BlockId,
    bbox: &BoundingBox,
) -> SpatialResult<Vec<LeafRef>> {
    let mut candidates = Vec::new();
    collect_overlapping(store, root_block_id, bbox, &mut candidates)?;

    let skyline: Vec<LeafRef> = candidates
        .iter()
        .filter(|candidate| {
            !candidates
                .iter()
                .any(|other| dominates(&other.bbox, &candidate.bbox))
        })
        .cloned()
        .collect();

    log::debug!(
        "skyline kept {} of {} candidates",
        skyline.len(),
        candidates.len()
    );
    Ok(skyline)
}
