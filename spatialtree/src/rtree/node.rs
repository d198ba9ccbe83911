//! Tree nodes, one per index-file block.

use serde::{Deserialize, Serialize};

use crate::block_store::{BlockId, LEAF_LEVEL};
use crate::bounding_box::BoundingBox;

use super::entry::Entry;

/// A node of the tree.
///
/// Level 1 holds leaf entries; every level above holds internal entries
/// pointing at nodes exactly one level below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub level: u32,
    pub block_id: BlockId,
    pub entries: Vec<Entry>,
}

impl Node {
    pub fn new(level: u32, block_id: BlockId, entries: Vec<Entry>) -> Self {
        Self {
            level,
            block_id,
            entries,
        }
    }

    /// An empty leaf, the root of a fresh tree.
    pub fn empty_leaf(block_id: BlockId) -> Self {
        Self::new(LEAF_LEVEL, block_id, Vec::new())
    }

    pub fn is_leaf(&self) -> bool {
        self.level == LEAF_LEVEL
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The MBR of all entries, `None` for an empty node.
    pub fn mbr(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(self.entries.iter().map(|e| &e.bbox))
    }
}
