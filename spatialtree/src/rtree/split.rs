//! The R*-tree split: axis by minimum margin sum, distribution by minimum
//! overlap (ties by minimum area).

use std::cmp::Ordering;

use crate::block_store::{SpatialError, SpatialResult};
use crate::bounding_box::BoundingBox;

use super::entry::Entry;

/// One sort order of the entries along an axis.
struct SortedAxis {
    entries: Vec<Entry>,
    /// `prefix[i]` encloses `entries[..=i]`.
    prefix: Vec<BoundingBox>,
    /// `suffix[i]` encloses `entries[i..]`.
    suffix: Vec<BoundingBox>,
}

impl SortedAxis {
    fn new(entries: Vec<Entry>) -> Self {
        let prefix = running_union(entries.iter().map(|e| &e.bbox));
        let mut suffix = running_union(entries.iter().rev().map(|e| &e.bbox));
        suffix.reverse();
        Self {
            entries,
            prefix,
            suffix,
        }
    }

    /// Boxes of the two groups when the first group holds `k` entries.
    fn groups(&self, k: usize) -> (&BoundingBox, &BoundingBox) {
        (&self.prefix[k - 1], &self.suffix[k])
    }
}

fn running_union<'a, I>(boxes: I) -> Vec<BoundingBox>
where
    I: Iterator<Item = &'a BoundingBox>,
{
    let mut out: Vec<BoundingBox> = Vec::new();
    for bbox in boxes {
        let next = match out.last() {
            Some(previous) => previous.union(bbox),
            None => bbox.clone(),
        };
        out.push(next);
    }
    out
}

fn sorted_by<F>(entries: &[Entry], key: F) -> Vec<Entry>
where
    F: Fn(&Entry) -> (f64, f64),
{
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
    sorted
}

/// Both sort orders of `entries` along `axis`: by lower, then by upper bound.
fn sort_axis(entries: &[Entry], axis: usize) -> [SortedAxis; 2] {
    let by_lower = sorted_by(entries, |e| {
        let b = e.bbox.bounds()[axis];
        (b.lower(), b.upper())
    });
    let by_upper = sorted_by(entries, |e| {
        let b = e.bbox.bounds()[axis];
        (b.upper(), b.lower())
    });
    [SortedAxis::new(by_lower), SortedAxis::new(by_upper)]
}

/// Splits an overflowing set of entries into two groups.
///
/// Every distribution puts between `min_entries` and `len - min_entries`
/// entries in the first group, so both groups respect the minimum fill.
pub fn split_entries(
    entries: Vec<Entry>,
    min_entries: usize,
) -> SpatialResult<(Vec<Entry>, Vec<Entry>)> {
    let total = entries.len();
    if min_entries == 0 || total < 2 * min_entries {
        return Err(SpatialError::InvalidState(format!(
            "cannot split {} entries with a minimum of {} per group",
            total, min_entries
        )));
    }
    let distributions = min_entries..=total - min_entries;
    let dimensions = entries[0].bbox.dimensions();

    let mut best_axis: Option<(f64, [SortedAxis; 2])> = None;
    for axis in 0..dimensions {
        let sorts = sort_axis(&entries, axis);
        let margin_sum: f64 = sorts
            .iter()
            .flat_map(|sort| {
                distributions.clone().map(move |k| {
                    let (first, second) = sort.groups(k);
                    first.margin() + second.margin()
                })
            })
            .sum();

        let better = match &best_axis {
            None => true,
            Some((best_margin, _)) => margin_sum < *best_margin,
        };
        if better {
            best_axis = Some((margin_sum, sorts));
        }
    }

    let (_, sorts) = best_axis
        .ok_or_else(|| SpatialError::InvalidState("entries without dimensions".into()))?;

    let mut best: Option<(f64, f64, usize, usize)> = None;
    for (sort_index, sort) in sorts.iter().enumerate() {
        for k in distributions.clone() {
            let (first, second) = sort.groups(k);
            let overlap = BoundingBox::calculate_overlap_value(first, second);
            let area = first.area() + second.area();
            let better = match best {
                None => true,
                Some((best_overlap, best_area, _, _)) => {
                    overlap < best_overlap || (overlap == best_overlap && area < best_area)
                }
            };
            if better {
                best = Some((overlap, area, sort_index, k));
            }
        }
    }

    let (_, _, sort_index, k) =
        best.ok_or_else(|| SpatialError::InvalidState("no split distribution".into()))?;
    let [by_lower, by_upper] = sorts;
    let mut chosen = if sort_index == 0 {
        by_lower.entries
    } else {
        by_upper.entries
    };
    let second = chosen.split_off(k);

    log::debug!(
        "split {} entries into groups of {} and {}",
        total,
        chosen.len(),
        second.len()
    );
    Ok((chosen, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u64, x: f64, y: f64) -> Entry {
        Entry::leaf(BoundingBox::from_point(&[x, y]).unwrap(), id, None)
    }

    fn ids(entries: &[Entry]) -> Vec<u64> {
        let mut ids: Vec<u64> = entries.iter().filter_map(Entry::record_id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_split_respects_minimum_fill() {
        let entries: Vec<Entry> = (0..17)
            .map(|i| leaf(i, (i * 7 % 17) as f64, (i * 3 % 17) as f64))
            .collect();
        let (first, second) = split_entries(entries, 6).unwrap();
        assert_eq!(first.len() + second.len(), 17);
        assert!(first.len() >= 6 && first.len() <= 11);
        assert!(second.len() >= 6 && second.len() <= 11);
    }

    #[test]
    fn test_split_separates_clusters() {
        let mut entries = Vec::new();
        for i in 0..5 {
            entries.push(leaf(i, i as f64 * 0.1, 50.0 + i as f64));
        }
        for i in 5..10 {
            entries.push(leaf(i, 100.0 + i as f64 * 0.1, 50.0 + i as f64));
        }
        let (first, second) = split_entries(entries, 2).unwrap();

        let (left, right) = if ids(&first).contains(&0) {
            (first, second)
        } else {
            (second, first)
        };
        assert_eq!(ids(&left), vec![0, 1, 2, 3, 4]);
        assert_eq!(ids(&right), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_split_chooses_axis_of_spread() {
        // spread along y, tight along x
        let entries: Vec<Entry> = (0..9)
            .map(|i| leaf(i, (i % 2) as f64, i as f64 * 10.0))
            .collect();
        let (first, second) = split_entries(entries, 3).unwrap();
        let first_box = BoundingBox::enclosing(first.iter().map(|e| &e.bbox)).unwrap();
        let second_box = BoundingBox::enclosing(second.iter().map(|e| &e.bbox)).unwrap();
        assert_eq!(
            BoundingBox::calculate_overlap_value(&first_box, &second_box),
            0.0
        );
        assert!(!first_box.overlaps(&second_box));
    }

    #[test]
    fn test_split_too_few_entries() {
        let entries = vec![leaf(1, 0.0, 0.0), leaf(2, 1.0, 1.0)];
        assert!(matches!(
            split_entries(entries, 2),
            Err(SpatialError::InvalidState(_))
        ));
    }
}
