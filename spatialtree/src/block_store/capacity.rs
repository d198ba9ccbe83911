//! Fanout derivation.
//!
//! The number of entries a node block holds is found by encoding synthetic
//! worst-case entries with the payload encoding, so the fanout follows the
//! block size and the dimensionality.

use serde::Serialize;

use super::block_file::encode_payload;
use super::constants::{LEAF_LEVEL, LENGTH_PREFIX_SIZE, MIN_FANOUT, MIN_FILL_FACTOR};
use super::types::{Capacity, SpatialError, SpatialResult};
use crate::bounding_box::BoundingBox;
use crate::record::Record;
use crate::rtree::{Entry, Node};

/// Derives the node fanout and the record packing limit for a block size.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidArgument`] when a node block cannot hold
/// at least four entries.
pub fn derive_capacity(dimensions: usize, block_size: usize) -> SpatialResult<Capacity> {
    let budget = block_size.saturating_sub(LENGTH_PREFIX_SIZE);

    let bbox = BoundingBox::from_point(&vec![f64::MAX; dimensions])?;
    let entry = Entry::leaf(bbox, u64::MAX, Some(u64::MAX));
    let max_entries = max_items_fitting(budget, entry, |entries| {
        Node::new(LEAF_LEVEL, u64::MAX, entries)
    })?;

    if max_entries < MIN_FANOUT {
        return Err(SpatialError::InvalidArgument(format!(
            "block size {} holds only {} entries of {} dimensions (need at least {})",
            block_size, max_entries, dimensions, MIN_FANOUT
        )));
    }

    let record = Record::new(u64::MAX, "", vec![f64::MAX; dimensions]);
    let max_records_per_block = max_items_fitting(budget, record, |records| records)?;

    let min_entries = ((max_entries as f64 * MIN_FILL_FACTOR) as usize).max(1);

    log::debug!(
        "derived capacity for {} dimensions, block size {}: max entries {}, min entries {}, records per block {}",
        dimensions,
        block_size,
        max_entries,
        min_entries,
        max_records_per_block
    );

    Ok(Capacity {
        max_entries,
        min_entries,
        max_records_per_block,
    })
}

/// Largest `n` such that the container built from `n` copies of `item`
/// encodes within `budget` bytes.
///
/// Starts from the estimate given by the encoded sizes of an empty and a
/// one-item container, then confirms it by encoding the full container.
fn max_items_fitting<T, C, F>(budget: usize, item: T, build: F) -> SpatialResult<usize>
where
    T: Clone,
    C: Serialize,
    F: Fn(Vec<T>) -> C,
{
    let empty = encode_payload(&build(Vec::new()))?.len();
    let single = encode_payload(&build(vec![item.clone()]))?.len();
    if empty >= budget || single > budget {
        return Ok(0);
    }

    let per_item = single - empty;
    let mut count = (budget - empty) / per_item.max(1);
    while count > 0 && encode_payload(&build(vec![item.clone(); count]))?.len() > budget {
        count -= 1;
    }
    while encode_payload(&build(vec![item.clone(); count + 1]))?.len() <= budget {
        count += 1;
    }
    Ok(count)
}
