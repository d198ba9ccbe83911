//! Stored records: the points indexed by the trees.

use serde::{Deserialize, Serialize};

use crate::block_store::{RecordId, SpatialError, SpatialResult};
use crate::bounding_box::BoundingBox;

/// A named point, stored in batches inside data-file blocks.
///
/// Records are written once and never rewritten; deleting through a tree
/// only removes the index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    name: String,
    coordinates: Vec<f64>,
}

impl Record {
    pub fn new(id: RecordId, name: impl Into<String>, coordinates: Vec<f64>) -> Self {
        Self {
            id,
            name: name.into(),
            coordinates,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn coordinate(&self, dimension: usize) -> Option<f64> {
        self.coordinates.get(dimension).copied()
    }

    pub fn dimensions(&self) -> usize {
        self.coordinates.len()
    }

    /// The degenerate box of this record's point.
    pub fn bounding_box(&self) -> SpatialResult<BoundingBox> {
        BoundingBox::from_point(&self.coordinates)
    }

    pub(crate) fn check_dimensions(&self, expected: usize) -> SpatialResult<()> {
        if self.coordinates.len() != expected {
            return Err(SpatialError::DimensionMismatch {
                expected,
                actual: self.coordinates.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.id, self.name)?;
        for coordinate in &self.coordinates {
            write!(f, ",{}", coordinate)?;
        }
        Ok(())
    }
}
