//! Queue Performance Benchmarks
//!
//! Measures single-thread put/take cost for both queue kinds, elastic
//! grow/shrink cycles, and multi-producer pipeline throughput.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parking_lot::Mutex;
use std::sync::Arc;

use flowq::flow::{split_sources, FlowControlConfig, Pipeline};
use flowq::queue::{BlockingQueue, BoundedQueue, ElasticQueue};

/// Fill then empty the queue in one thread; never suspends
fn bench_put_take_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_take_cycle");

    for capacity in [16i64, 256, 4096] {
        group.throughput(Throughput::Elements(capacity as u64));

        let bounded = BoundedQueue::<u64>::new(capacity).unwrap();
        group.bench_with_input(BenchmarkId::new("bounded", capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                for i in 0..capacity as u64 {
                    bounded.put(i).unwrap();
                }
                for _ in 0..capacity {
                    bounded.take().unwrap();
                }
            })
        });

        let elastic = ElasticQueue::<u64>::new(capacity).unwrap();
        group.bench_with_input(BenchmarkId::new("elastic", capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                for i in 0..capacity as u64 {
                    elastic.put(i).unwrap();
                }
                for _ in 0..capacity {
                    elastic.take().unwrap();
                }
            })
        });
    }

    group.finish();
}

/// Overfill an elastic queue so every iteration grows and snaps back
fn bench_elastic_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("elastic_resize");

    for multiple in [2u64, 8, 32] {
        let initial = 64i64;
        let items = initial as u64 * multiple;
        group.throughput(Throughput::Elements(items));

        let queue = ElasticQueue::<u64>::new(initial).unwrap();
        group.bench_with_input(BenchmarkId::new("overfill", multiple), &items, |b, &items| {
            b.iter(|| {
                for i in 0..items {
                    queue.put(i).unwrap();
                }
                while queue.try_take().is_some() {}
            })
        });
    }

    group.finish();
}

/// Producers and consumers on dedicated threads around one bounded queue
fn bench_pipeline_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_throughput");
    group.sample_size(10);

    let items = 20_000usize;
    for workers in [1usize, 2, 4] {
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.iter(|| {
                let queue = Arc::new(BoundedQueue::<u64>::new(256).unwrap());
                let sink: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::with_capacity(items)));
                let sources = split_sources((0..items as u64).collect(), workers);
                let summary = Pipeline::new(queue, FlowControlConfig::responsive())
                    .run(sources, workers, sink)
                    .unwrap();
                assert!(summary.is_complete());
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_take_cycle,
    bench_elastic_resize,
    bench_pipeline_throughput
);
criterion_main!(benches);
