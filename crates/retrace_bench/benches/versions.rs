//! Version query benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use retrace_bench::populated_context;
use retrace_core::{Config, VersionQuery, VersionStrategy};
use retrace_testkit::ProductHistory;

const ENTITIES: i32 = 50;

/// Benchmark listing one entity's versions under both strategies.
fn bench_list_versions(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_versions");

    for versions in [4usize, 32, 128].iter() {
        let ctx = populated_context(Config::default(), ENTITIES, *versions);
        group.throughput(Throughput::Elements(*versions as u64));

        for strategy in [VersionStrategy::Pushdown, VersionStrategy::Eager] {
            let query = VersionQuery::new(ctx.store(), strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), versions),
                versions,
                |b, _| {
                    let mut rng = rand::thread_rng();
                    b.iter(|| {
                        let id = rng.gen_range(1..=ENTITIES);
                        black_box(query.list::<ProductHistory>(&id).unwrap());
                    });
                },
            );
        }
    }
    group.finish();
}

/// Benchmark fetching a single version under both strategies.
fn bench_find_version(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_version");
    let versions = 64usize;
    let ctx = populated_context(Config::default(), ENTITIES, versions);

    for strategy in [VersionStrategy::Pushdown, VersionStrategy::Eager] {
        let query = VersionQuery::new(ctx.store(), strategy);
        group.bench_function(format!("{strategy:?}"), |b| {
            let mut rng = rand::thread_rng();
            b.iter(|| {
                let id = rng.gen_range(1..=ENTITIES);
                let version = rng.gen_range(1..=versions as u32);
                black_box(query.find::<ProductHistory>(&id, version).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_list_versions, bench_find_version);
criterion_main!(benches);
