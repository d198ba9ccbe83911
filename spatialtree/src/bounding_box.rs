use serde::{Deserialize, Serialize};

use crate::block_store::{SpatialError, SpatialResult};

/// A closed interval `[lower, upper]` along one dimension.
///
/// The constructor rejects `lower > upper` (and NaN bounds), so every
/// `Bounds` value in the system satisfies `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: f64,
    upper: f64,
}

impl Bounds {
    /// Creates a new interval.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if `lower > upper` or either
    /// bound is NaN.
    pub fn new(lower: f64, upper: f64) -> SpatialResult<Bounds> {
        if lower <= upper {
            Ok(Bounds { lower, upper })
        } else {
            Err(SpatialError::InvalidArgument(format!(
                "lower bound {} cannot be bigger than upper bound {}",
                lower, upper
            )))
        }
    }

    /// A degenerate interval holding a single value.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] for NaN.
    pub fn point(value: f64) -> SpatialResult<Bounds> {
        Bounds::new(value, value)
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Length of the interval.
    pub fn extent(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Length of the intersection with `other`; negative when they are disjoint.
    fn overlap_length(&self, other: &Bounds) -> f64 {
        self.upper.min(other.upper) - self.lower.max(other.lower)
    }

    fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Per-dimension minimum intervals enclosing every box of `boxes`.
    ///
    /// Returns `None` for an empty input.
    pub fn find_minimum_bounds<'a, I>(boxes: I) -> Option<Vec<Bounds>>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        let mut iter = boxes.into_iter();
        let mut bounds = iter.next()?.bounds.clone();
        for bbox in iter {
            debug_assert_eq!(bbox.dimensions(), bounds.len());
            for (current, other) in bounds.iter_mut().zip(&bbox.bounds) {
                *current = current.merge(other);
            }
        }
        Some(bounds)
    }

    /// Per-dimension minimum intervals enclosing both boxes.
    pub fn find_minimum_bounds_of_pair(a: &BoundingBox, b: &BoundingBox) -> Vec<Bounds> {
        debug_assert_eq!(a.dimensions(), b.dimensions());
        a.bounds
            .iter()
            .zip(&b.bounds)
            .map(|(x, y)| x.merge(y))
            .collect()
    }
}

/// An axis-aligned box in n-dimensional space, one [`Bounds`] per dimension.
///
/// All boxes that are compared or merged must share the same dimensionality;
/// the store checks this at its public boundaries.
///
/// # Examples
///
/// ```rust
/// use spatialtree::BoundingBox;
///
/// let bbox = BoundingBox::from_ranges(&[(0.0, 2.0), (0.0, 4.0)]).unwrap();
/// assert_eq!(bbox.area(), 8.0);
/// assert_eq!(bbox.margin(), 6.0);
/// assert_eq!(bbox.center(), vec![1.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    bounds: Vec<Bounds>,
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundingBox(")?;
        for (d, b) in self.bounds.iter().enumerate() {
            if d > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}, {}]", b.lower, b.upper)?;
        }
        write!(f, ")")
    }
}

impl BoundingBox {
    /// Creates a box from per-dimension intervals.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] when `bounds` is empty.
    pub fn new(bounds: Vec<Bounds>) -> SpatialResult<BoundingBox> {
        if bounds.is_empty() {
            return Err(SpatialError::InvalidArgument(
                "a bounding box needs at least one dimension".into(),
            ));
        }
        Ok(BoundingBox { bounds })
    }

    /// Creates a box from `(lower, upper)` pairs.
    pub fn from_ranges(ranges: &[(f64, f64)]) -> SpatialResult<BoundingBox> {
        let bounds = ranges
            .iter()
            .map(|&(lower, upper)| Bounds::new(lower, upper))
            .collect::<SpatialResult<Vec<_>>>()?;
        BoundingBox::new(bounds)
    }

    /// The degenerate box of a point: `lower == upper` in every dimension.
    pub fn from_point(point: &[f64]) -> SpatialResult<BoundingBox> {
        let bounds = point
            .iter()
            .map(|&value| Bounds::point(value))
            .collect::<SpatialResult<Vec<_>>>()?;
        BoundingBox::new(bounds)
    }

    /// Minimum box enclosing all of `boxes`, or `None` for an empty input.
    pub fn enclosing<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        Bounds::find_minimum_bounds(boxes).map(|bounds| BoundingBox { bounds })
    }

    /// Minimum box enclosing `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            bounds: Bounds::find_minimum_bounds_of_pair(self, other),
        }
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Product of the extents (volume in more than two dimensions).
    pub fn area(&self) -> f64 {
        self.bounds.iter().map(Bounds::extent).product::<f64>().abs()
    }

    /// Sum of the extents.
    pub fn margin(&self) -> f64 {
        self.bounds.iter().map(|b| b.extent().abs()).sum()
    }

    /// Midpoint of every dimension.
    pub fn center(&self) -> Vec<f64> {
        self.bounds.iter().map(Bounds::center).collect()
    }

    /// Area growth needed to also cover `other`.
    pub fn enlargement(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }

    /// Whether the two boxes intersect (touching counts as intersecting).
    ///
    /// Stops at the first dimension whose projections are disjoint.
    pub fn check_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
        a.bounds
            .iter()
            .zip(&b.bounds)
            .all(|(x, y)| x.overlap_length(y) >= 0.0)
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        BoundingBox::check_overlap(self, other)
    }

    /// Product of the per-dimension overlap lengths, or 0 when the boxes are disjoint.
    pub fn calculate_overlap_value(a: &BoundingBox, b: &BoundingBox) -> f64 {
        let mut value = 1.0;
        for (x, y) in a.bounds.iter().zip(&b.bounds) {
            let overlap = x.overlap_length(y);
            if overlap < 0.0 {
                return 0.0;
            }
            value *= overlap;
        }
        value
    }

    /// Euclidean distance from `point` to the nearest point of the box, 0 when inside.
    pub fn find_min_distance_from_point(&self, point: &[f64]) -> f64 {
        debug_assert_eq!(self.dimensions(), point.len());
        self.bounds
            .iter()
            .zip(point)
            .map(|(b, &p)| {
                let nearest = p.clamp(b.lower, b.upper);
                (p - nearest) * (p - nearest)
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Euclidean distance between the centres of two boxes.
    pub fn find_distance_between_bounding_boxes(a: &BoundingBox, b: &BoundingBox) -> f64 {
        a.bounds
            .iter()
            .zip(&b.bounds)
            .map(|(x, y)| {
                let delta = x.center() - y.center();
                delta * delta
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Whether `point` lies inside or on the border of the box.
    pub fn contains_point(&self, point: &[f64]) -> bool {
        self.bounds
            .iter()
            .zip(point)
            .all(|(b, &p)| p >= b.lower && p <= b.upper)
    }

    /// Whether `other` lies completely inside the box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.bounds
            .iter()
            .zip(&other.bounds)
            .all(|(outer, inner)| outer.lower <= inner.lower && outer.upper >= inner.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(ranges: &[(f64, f64)]) -> BoundingBox {
        BoundingBox::from_ranges(ranges).unwrap()
    }

    #[test]
    fn test_bounds_rejects_inverted_interval() {
        assert!(Bounds::new(1.0, 0.0).is_err());
        assert!(Bounds::new(f64::NAN, 0.0).is_err());
        let b = Bounds::new(-1.0, 1.0).unwrap();
        assert_eq!(b.lower(), -1.0);
        assert_eq!(b.upper(), 1.0);
        assert_eq!(b.extent(), 2.0);
    }

    #[test]
    fn test_empty_box_rejected() {
        assert!(BoundingBox::new(vec![]).is_err());
        assert!(BoundingBox::from_point(&[]).is_err());
    }

    #[test]
    fn test_area_margin_center() {
        let b = bbox(&[(0.0, 2.0), (1.0, 4.0), (0.0, 0.5)]);
        assert_eq!(b.area(), 3.0);
        assert_eq!(b.margin(), 5.5);
        assert_eq!(b.center(), vec![1.0, 2.5, 0.25]);

        let p = BoundingBox::from_point(&[3.0, 4.0]).unwrap();
        assert_eq!(p.area(), 0.0);
        assert_eq!(p.margin(), 0.0);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = bbox(&[(0.0, 2.0), (0.0, 2.0)]);
        let b = bbox(&[(1.0, 3.0), (1.0, 3.0)]);
        let c = bbox(&[(5.0, 6.0), (0.0, 1.0)]);
        let touching = bbox(&[(2.0, 4.0), (0.0, 1.0)]);

        assert!(BoundingBox::check_overlap(&a, &b));
        assert!(BoundingBox::check_overlap(&b, &a));
        assert!(!BoundingBox::check_overlap(&a, &c));
        assert!(!BoundingBox::check_overlap(&c, &a));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
    }

    #[test]
    fn test_overlap_value_zero_iff_disjoint() {
        let a = bbox(&[(0.0, 2.0), (0.0, 2.0)]);
        let b = bbox(&[(1.0, 3.0), (1.0, 3.0)]);
        let c = bbox(&[(5.0, 6.0), (0.0, 1.0)]);

        assert_eq!(BoundingBox::calculate_overlap_value(&a, &b), 1.0);
        assert_eq!(BoundingBox::calculate_overlap_value(&b, &a), 1.0);
        assert_eq!(BoundingBox::calculate_overlap_value(&a, &c), 0.0);
        assert!(!BoundingBox::check_overlap(&a, &c));
    }

    #[test]
    fn test_minimum_bounds_enclose_inputs() {
        let boxes = vec![
            bbox(&[(0.0, 1.0), (5.0, 6.0)]),
            bbox(&[(-2.0, 0.5), (1.0, 2.0)]),
            BoundingBox::from_point(&[3.0, 3.0]).unwrap(),
        ];
        let enclosing = BoundingBox::enclosing(&boxes).unwrap();
        assert_eq!(enclosing, bbox(&[(-2.0, 3.0), (1.0, 6.0)]));
        for b in &boxes {
            assert!(enclosing.contains(b));
        }

        let empty: Vec<BoundingBox> = Vec::new();
        assert!(BoundingBox::enclosing(&empty).is_none());
    }

    #[test]
    fn test_union_and_enlargement() {
        let a = bbox(&[(0.0, 1.0), (0.0, 1.0)]);
        let b = bbox(&[(2.0, 3.0), (0.0, 1.0)]);
        assert_eq!(a.union(&b), bbox(&[(0.0, 3.0), (0.0, 1.0)]));
        assert_eq!(a.enlargement(&b), 2.0);
        assert_eq!(a.enlargement(&a), 0.0);
    }

    #[test]
    fn test_min_distance_from_point() {
        let b = bbox(&[(0.0, 2.0), (0.0, 2.0)]);
        assert_eq!(b.find_min_distance_from_point(&[1.0, 1.0]), 0.0);
        assert_eq!(b.find_min_distance_from_point(&[2.0, 0.0]), 0.0);
        assert_eq!(b.find_min_distance_from_point(&[5.0, 1.0]), 3.0);
        assert_eq!(b.find_min_distance_from_point(&[5.0, 6.0]), 5.0);
    }

    #[test]
    fn test_center_distance() {
        let a = bbox(&[(0.0, 2.0), (0.0, 2.0)]);
        let b = bbox(&[(3.0, 5.0), (4.0, 6.0)]);
        assert_eq!(BoundingBox::find_distance_between_bounding_boxes(&a, &b), 5.0);
        assert_eq!(BoundingBox::find_distance_between_bounding_boxes(&a, &a), 0.0);
    }

    #[test]
    fn test_contains_point() {
        let b = bbox(&[(0.0, 2.0), (0.0, 2.0)]);
        assert!(b.contains_point(&[0.0, 2.0]));
        assert!(!b.contains_point(&[2.1, 1.0]));
    }

    #[test]
    fn test_display() {
        let b = bbox(&[(0.0, 1.0), (2.0, 3.0)]);
        assert_eq!(b.to_string(), "BoundingBox([0, 1], [2, 3])");
    }
}
