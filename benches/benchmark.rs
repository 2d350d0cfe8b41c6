use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use avl_containers::{AvlTreeMap, AvlTreeMultiMap, AvlTreeMultiSet};

const N: usize = 100_000;

pub fn map_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("map_insert", |b| {
        b.iter(|| {
            let mut map = AvlTreeMap::new();
            for value in &values {
                map.insert(*value, *value).unwrap();
            }
            map
        })
    });

    let map: AvlTreeMap<i32, i32> = values.iter().map(|value| (*value, *value)).collect();

    c.bench_function("map_get", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.get(value));
            }
        })
    });

    c.bench_function("map_ceiling", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.ceiling(&value.wrapping_add(1)));
            }
        })
    });

    c.bench_function("map_iter", |b| {
        b.iter(|| {
            for (k, v) in &map {
                black_box((k, v));
            }
        })
    });

    c.bench_function("map_remove", |b| {
        b.iter_batched_ref(
            || map.clone(),
            |map| {
                for value in &values {
                    black_box(map.remove(value));
                }
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

pub fn multi_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let keys: Vec<u16> = (1..=N).map(|_| rng.gen_range(0..1_000)).collect();

    c.bench_function("multimap_insert", |b| {
        b.iter(|| {
            let mut map = AvlTreeMultiMap::new();
            for (index, key) in keys.iter().enumerate() {
                map.insert(*key, index).unwrap();
            }
            map
        })
    });

    c.bench_function("multiset_insert", |b| {
        b.iter(|| {
            let mut set = AvlTreeMultiSet::new();
            for key in &keys {
                set.insert(*key).unwrap();
            }
            set
        })
    });
}

criterion_group!(benches, map_benchmarks, multi_benchmarks);
criterion_main!(benches);
