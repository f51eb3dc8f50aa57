//! Save pipeline benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use retrace_bench::random_product;
use retrace_core::{CommitMode, Config};
use retrace_testkit::{product_context, Product};

/// Benchmark updates that record history, per commit mode.
fn bench_changed_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("changed_update");

    for mode in [CommitMode::TwoPhase, CommitMode::Atomic] {
        group.bench_function(format!("{mode:?}"), |b| {
            let ctx = product_context(Config::new().commit_mode(mode));
            ctx.insert(&Product::new(1, "start", 100)).unwrap();
            let mut price = 100;
            b.iter(|| {
                price += 1;
                ctx.update(black_box(&Product::new(1, "start", price))).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark saves that change nothing.
fn bench_unchanged_update(c: &mut Criterion) {
    c.bench_function("unchanged_update", |b| {
        let ctx = product_context(Config::default());
        let product = Product::new(1, "same", 100);
        ctx.insert(&product).unwrap();
        b.iter(|| {
            ctx.update(black_box(&product)).unwrap();
        });
    });
}

/// Benchmark one unit of work touching many entities.
fn bench_batch_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_save");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let ctx = product_context(Config::default());
                let mut next_id = 0;
                b.iter(|| {
                    let mut uow = ctx.begin().unwrap();
                    for _ in 0..batch_size {
                        next_id += 1;
                        ctx.stage_insert(&mut uow, &random_product(next_id)).unwrap();
                    }
                    ctx.save_changes(&mut uow).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_changed_update,
    bench_unchanged_update,
    bench_batch_save
);
criterion_main!(benches);
