//! Read-only query engines.
//!
//! Every query starts at a root block and reads children on demand; the
//! functions here take the store and root explicitly so both trees share
//! them through [`SpatialIndex`](crate::SpatialIndex).

mod knn;
mod range;
mod skyline;

pub use knn::{knn, knn_with_distances, within_distance};
pub use range::range_query;
pub use skyline::{dominates, skyline};
