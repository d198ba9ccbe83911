#![allow(dead_code)]

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatialtree::{BoundingBox, Record, StoreConfig};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Blocks small enough that a few hundred records build a multi-level tree.
pub fn small_config(dir: &Path, dimensions: usize) -> StoreConfig {
    StoreConfig::new(dir)
        .with_dimensions(dimensions)
        .with_block_size(1024)
}

pub fn random_records(seed: u64, count: u64, dimensions: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let coordinates = (0..dimensions).map(|_| rng.gen_range(-100.0..100.0)).collect();
            Record::new(id, format!("r{}", id), coordinates)
        })
        .collect()
}

pub fn random_box(rng: &mut StdRng, dimensions: usize) -> BoundingBox {
    let ranges: Vec<(f64, f64)> = (0..dimensions)
        .map(|_| {
            let a: f64 = rng.gen_range(-110.0..110.0);
            let b: f64 = rng.gen_range(-110.0..110.0);
            (a.min(b), a.max(b))
        })
        .collect();
    BoundingBox::from_ranges(&ranges).unwrap()
}

pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

pub fn brute_force_range(records: &[Record], bbox: &BoundingBox) -> Vec<u64> {
    let mut ids: Vec<u64> = records
        .iter()
        .filter(|r| bbox.contains_point(r.coordinates()))
        .map(Record::id)
        .collect();
    ids.sort_unstable();
    ids
}

/// Distances of the `k` records nearest to `point`, ascending.
pub fn brute_force_knn_distances(records: &[Record], point: &[f64], k: usize) -> Vec<f64> {
    let mut distances: Vec<f64> = records
        .iter()
        .map(|r| distance(r.coordinates(), point))
        .collect();
    distances.sort_by(f64::total_cmp);
    distances.truncate(k);
    distances
}

fn dominates(a: &Record, b: &Record) -> bool {
    a.coordinates()
        .iter()
        .zip(b.coordinates())
        .all(|(x, y)| x <= y)
        && a.coordinates() != b.coordinates()
}

pub fn brute_force_skyline(records: &[Record], bbox: &BoundingBox) -> Vec<u64> {
    let inside: Vec<&Record> = records
        .iter()
        .filter(|r| bbox.contains_point(r.coordinates()))
        .collect();
    let mut ids: Vec<u64> = inside
        .iter()
        .filter(|&&candidate| !inside.iter().any(|&other| dominates(other, candidate)))
        .map(|r| r.id())
        .collect();
    ids.sort_unstable();
    ids
}

pub fn sorted_ids(leaves: &[spatialtree::LeafRef]) -> Vec<u64> {
    let mut ids: Vec<u64> = leaves.iter().map(|l| l.record_id).collect();
    ids.sort_unstable();
    ids
}
