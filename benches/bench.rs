use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rb_key_tree::RbTree;
use std::hint::black_box;

struct KeyGenerator {
    rng: StdRng,
    limit: u32,
}
impl KeyGenerator {
    fn new() -> Self {
        const LIMIT: u32 = 1_000_000;
        Self {
            rng: StdRng::from_seed([0; 32]),
            limit: LIMIT,
        }
    }

    fn next(&mut self) -> u32 {
        self.rng.gen_range(0..self.limit)
    }
}

fn random_keys(count: usize) -> Vec<u32> {
    let mut gen = KeyGenerator::new();
    std::iter::repeat_with(|| gen.next()).take(count).collect()
}

// insert helper fn
fn rb_tree_insert(count: usize, bench: &mut Bencher) {
    let keys = random_keys(count);
    bench.iter(|| {
        let mut tree = RbTree::new();
        for k in keys.iter().copied() {
            let _ignore = black_box(tree.insert(k));
        }
    });
}

// insert and erase helper fn
fn rb_tree_insert_erase(count: usize, bench: &mut Bencher) {
    let keys = random_keys(count);
    bench.iter(|| {
        let mut tree = RbTree::new();
        let handles: Vec<_> = keys.iter().map(|&k| tree.insert(k)).collect();
        for h in handles.into_iter().flatten() {
            let _ignore = black_box(tree.erase(h));
        }
    });
}

// to_array helper fn
fn rb_tree_to_array(count: usize, bench: &mut Bencher) {
    let keys = random_keys(count);
    let mut tree = RbTree::new();
    for k in keys.iter().copied() {
        let _ignore = tree.insert(k);
    }
    let mut buf = vec![0; count];
    bench.iter(|| {
        let _ignore = black_box(tree.to_array(&mut buf));
    });
}

fn bench_rb_tree_insert(c: &mut Criterion) {
    c.bench_function("bench_rb_tree_insert_100", |b| rb_tree_insert(100, b));
    c.bench_function("bench_rb_tree_insert_1000", |b| rb_tree_insert(1000, b));
    c.bench_function("bench_rb_tree_insert_10,000", |b| {
        rb_tree_insert(10_000, b)
    });
    c.bench_function("bench_rb_tree_insert_100,000", |b| {
        rb_tree_insert(100_000, b)
    });
}

fn bench_rb_tree_insert_erase(c: &mut Criterion) {
    c.bench_function("bench_rb_tree_insert_erase_100", |b| {
        rb_tree_insert_erase(100, b)
    });
    c.bench_function("bench_rb_tree_insert_erase_1000", |b| {
        rb_tree_insert_erase(1000, b)
    });
    c.bench_function("bench_rb_tree_insert_erase_10,000", |b| {
        rb_tree_insert_erase(10_000, b)
    });
    c.bench_function("bench_rb_tree_insert_erase_100,000", |b| {
        rb_tree_insert_erase(100_000, b)
    });
}

fn bench_rb_tree_to_array(c: &mut Criterion) {
    c.bench_function("bench_rb_tree_to_array_1000", |b| {
        rb_tree_to_array(1000, b)
    });
    c.bench_function("bench_rb_tree_to_array_100,000", |b| {
        rb_tree_to_array(100_000, b)
    });
}

fn criterion_config() -> Criterion {
    Criterion::default().configure_from_args().without_plots()
}

criterion_group! {
    name = benches_basic_op;
    config = criterion_config();
    targets = bench_rb_tree_insert, bench_rb_tree_insert_erase,
}

criterion_group! {
    name = benches_export;
    config = criterion_config();
    targets = bench_rb_tree_to_array
}

criterion_main!(benches_basic_op, benches_export);
