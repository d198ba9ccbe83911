//! R*-tree benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatialtree::{
    BlockStore, BoundingBox, BulkLoadedRStarTree, RStarTree, Record, SpatialIndex, StoreConfig,
};
use std::hint::black_box;
use tempfile::tempdir;

fn random_records(count: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|i| {
            Record::new(
                i,
                format!("place-{}", i),
                vec![rng.gen_range(-90.0..90.0), rng.gen_range(-180.0..180.0)],
            )
        })
        .collect()
}

fn bench_rstar_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("RStarTree Insert");
    group.sample_size(10);

    for size in [100u64, 1000, 5000].iter() {
        let records = random_records(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let store = BlockStore::open(StoreConfig::new(dir.path())).unwrap();
                    store.create_data_file(records, true).unwrap();
                    (store, dir)
                },
                |(store, _dir)| {
                    let tree = RStarTree::build_from_data_file(store).unwrap();
                    black_box(tree.total_levels())
                },
            );
        });
    }

    group.finish();
}

fn bench_bulk_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bulk Load");
    group.sample_size(10);

    for size in [1000u64, 10000].iter() {
        let records = random_records(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let store = BlockStore::open(StoreConfig::new(dir.path())).unwrap();
                    store.create_data_file(records, true).unwrap();
                    (store, dir)
                },
                |(store, _dir)| {
                    let tree = BulkLoadedRStarTree::build(store).unwrap();
                    black_box(tree.root_block_id())
                },
            );
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("Queries");

    let dir = tempdir().unwrap();
    let store = BlockStore::open(StoreConfig::new(dir.path())).unwrap();
    store.create_data_file(&random_records(10000), true).unwrap();
    let tree = RStarTree::build_from_data_file(store).unwrap();

    group.bench_function("range_10k", |b| {
        let query = BoundingBox::from_ranges(&[(-10.0, 10.0), (-20.0, 20.0)]).unwrap();
        b.iter(|| black_box(tree.range_query(&query).unwrap()));
    });

    for k in [1usize, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("knn_10k", k), k, |b, &k| {
            b.iter(|| black_box(tree.knn(&[12.5, -33.0], k).unwrap()));
        });
    }

    group.bench_function("skyline_10k", |b| {
        let query = BoundingBox::from_ranges(&[(0.0, 45.0), (0.0, 90.0)]).unwrap();
        b.iter(|| black_box(tree.skyline(&query).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_rstar_insert, bench_bulk_load, bench_queries);
criterion_main!(benches);
