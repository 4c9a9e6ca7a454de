//! Insert/range/nearest throughput across the five spatial-index backends,
//! replacing the teacher's hand-timed `bench_pareto_pq` binary with a
//! criterion harness (spec §2's Ambient stack, test tooling).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use pareto_space::index::{
    Aabb, KdTreeIndex, LinearIndex, QuadtreeIndex, RStarTreeIndex, RTreeIndex, SpatialIndex,
};
use pareto_space::Point;

const DIMS: usize = 3;

fn random_points(n: usize, seed: u64) -> Vec<Point<i32>> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((state >> 33) as i32).rem_euclid(10_000)
    };
    (0..n)
        .map(|_| Point::from_vec((0..DIMS).map(|_| next()).collect()))
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let points = random_points(2_000, 1);
    let mut group = c.benchmark_group("insert");
    group.bench_function(BenchmarkId::new("linear", points.len()), |b| {
        b.iter(|| {
            let mut idx: LinearIndex<i32, ()> = LinearIndex::new(DIMS);
            for p in &points {
                idx.insert(p.clone(), ()).unwrap();
            }
            black_box(idx.size())
        })
    });
    group.bench_function(BenchmarkId::new("kd_tree", points.len()), |b| {
        b.iter(|| {
            let mut idx: KdTreeIndex<i32, ()> = KdTreeIndex::new(DIMS);
            for p in &points {
                idx.insert(p.clone(), ()).unwrap();
            }
            black_box(idx.size())
        })
    });
    group.bench_function(BenchmarkId::new("quadtree", points.len()), |b| {
        b.iter(|| {
            let mut idx: QuadtreeIndex<i32, ()> = QuadtreeIndex::new(DIMS);
            for p in &points {
                idx.insert(p.clone(), ()).unwrap();
            }
            black_box(idx.size())
        })
    });
    group.bench_function(BenchmarkId::new("rtree", points.len()), |b| {
        b.iter(|| {
            let mut idx: RTreeIndex<i32, ()> = RTreeIndex::new(DIMS);
            for p in &points {
                idx.insert(p.clone(), ()).unwrap();
            }
            black_box(idx.size())
        })
    });
    group.bench_function(BenchmarkId::new("rstar", points.len()), |b| {
        b.iter(|| {
            let mut idx: RStarTreeIndex<i32, ()> = RStarTreeIndex::new(DIMS);
            for p in &points {
                idx.insert(p.clone(), ()).unwrap();
            }
            black_box(idx.size())
        })
    });
    group.finish();
}

fn bench_range(c: &mut Criterion) {
    let points = random_points(5_000, 2);
    let bbox = Aabb::new(vec![0, 0, 0], vec![5_000, 5_000, 5_000]);

    macro_rules! bench_one {
        ($group:expr, $name:literal, $ty:ty) => {
            let idx: $ty = <$ty as SpatialIndex<i32, ()>>::bulk_load(
                DIMS,
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| pareto_space::index::Element::new(p.clone(), (), i as u64))
                    .collect(),
            )
            .unwrap();
            $group.bench_function($name, |b| b.iter(|| black_box(idx.range(&bbox).count())));
        };
    }

    let mut group = c.benchmark_group("range");
    bench_one!(group, "linear", LinearIndex<i32, ()>);
    bench_one!(group, "kd_tree", KdTreeIndex<i32, ()>);
    bench_one!(group, "quadtree", QuadtreeIndex<i32, ()>);
    bench_one!(group, "rtree", RTreeIndex<i32, ()>);
    bench_one!(group, "rstar", RStarTreeIndex<i32, ()>);
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let points = random_points(5_000, 3);
    let mut rng = rand::thread_rng();
    let query = Point::from_vec((0..DIMS).map(|_| rng.gen_range(0..10_000)).collect());

    macro_rules! bench_one {
        ($group:expr, $name:literal, $ty:ty) => {
            let idx: $ty = <$ty as SpatialIndex<i32, ()>>::bulk_load(
                DIMS,
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| pareto_space::index::Element::new(p.clone(), (), i as u64))
                    .collect(),
            )
            .unwrap();
            $group.bench_function($name, |b| b.iter(|| black_box(idx.nearest(&query, 10).unwrap())));
        };
    }

    let mut group = c.benchmark_group("nearest");
    bench_one!(group, "linear", LinearIndex<i32, ()>);
    bench_one!(group, "kd_tree", KdTreeIndex<i32, ()>);
    bench_one!(group, "quadtree", QuadtreeIndex<i32, ()>);
    bench_one!(group, "rtree", RTreeIndex<i32, ()>);
    bench_one!(group, "rstar", RStarTreeIndex<i32, ()>);
    group.finish();
}

criterion_group!(benches, bench_insert, bench_range, bench_nearest);
criterion_main!(benches);
