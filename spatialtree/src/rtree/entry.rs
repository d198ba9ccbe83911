//! Node entries: a bounding box plus either a child pointer or a record reference.

use serde::{Deserialize, Serialize};

use crate::block_store::{BlockId, RecordId, SpatialResult};
use crate::bounding_box::BoundingBox;
use crate::record::Record;

/// What an entry points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Entry of a non-leaf node, pointing at the node stored in `child_block_id`.
    Internal { child_block_id: BlockId },
    /// Entry of a leaf node, pointing at a stored record.
    ///
    /// `data_block_id` is the data-file block holding the record when the
    /// tree knows it; bulk-loaded leaves leave it unset.
    Leaf {
        record_id: RecordId,
        data_block_id: Option<BlockId>,
    },
}

/// An entry of a [`Node`](super::Node).
///
/// Equality compares the box as well as the target. Deletion matches leaves
/// by record alone through [`Entry::refers_to_same_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub bbox: BoundingBox,
    pub kind: EntryKind,
}

impl Entry {
    pub fn internal(bbox: BoundingBox, child_block_id: BlockId) -> Self {
        Self {
            bbox,
            kind: EntryKind::Internal { child_block_id },
        }
    }

    pub fn leaf(bbox: BoundingBox, record_id: RecordId, data_block_id: Option<BlockId>) -> Self {
        Self {
            bbox,
            kind: EntryKind::Leaf {
                record_id,
                data_block_id,
            },
        }
    }

    /// The leaf entry indexing `record`.
    pub fn for_record(record: &Record, data_block_id: Option<BlockId>) -> SpatialResult<Self> {
        Ok(Self::leaf(record.bounding_box()?, record.id(), data_block_id))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, EntryKind::Leaf { .. })
    }

    pub fn child_block_id(&self) -> Option<BlockId> {
        match self.kind {
            EntryKind::Internal { child_block_id } => Some(child_block_id),
            EntryKind::Leaf { .. } => None,
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        match self.kind {
            EntryKind::Leaf { record_id, .. } => Some(record_id),
            EntryKind::Internal { .. } => None,
        }
    }

    /// Leaf identity: both entries are leaves of the same record.
    ///
    /// Internal entries never match, whatever they point at.
    pub fn refers_to_same_record(&self, other: &Entry) -> bool {
        match (&self.kind, &other.kind) {
            (EntryKind::Leaf { record_id: a, .. }, EntryKind::Leaf { record_id: b, .. }) => a == b,
            _ => false,
        }
    }

    /// The query-facing view of a leaf entry.
    pub fn to_leaf_ref(&self) -> Option<LeafRef> {
        match self.kind {
            EntryKind::Leaf {
                record_id,
                data_block_id,
            } => Some(LeafRef {
                record_id,
                data_block_id,
                bbox: self.bbox.clone(),
            }),
            EntryKind::Internal { .. } => None,
        }
    }
}

/// A leaf entry returned by a query.
///
/// Resolve it to the stored [`Record`] with
/// [`SpatialIndex::resolve`](crate::SpatialIndex::resolve).
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRef {
    pub record_id: RecordId,
    pub data_block_id: Option<BlockId>,
    pub bbox: BoundingBox,
}

impl LeafRef {
    /// The leaf entry this reference was taken from.
    pub fn to_entry(&self) -> Entry {
        Entry::leaf(self.bbox.clone(), self.record_id, self.data_block_id)
    }
}
