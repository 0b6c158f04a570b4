//! # Event Fabric Benchmarks
//!
//! | Path | Measured |
//! |------|----------|
//! | BasicBus publish | fan-out to N matching subscriptions |
//! | MemoryHistoryStore | publish with retention, tail fetch |
//! | DefinitionRegistry | glob expansion |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fabric_bus::{channel, BasicBus, HistoryBackend, MemoryHistoryStore, PubSub, StoreConfig};
use fabric_tests::integration::fixtures::{app, registry, uplink};
use fabric_types::{CallContext, Event};
use std::time::Duration;

fn bench_publish_fan_out(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("bus-publish");
    group.measurement_time(Duration::from_secs(5));

    for subscribers in [1usize, 10, 100] {
        let bus = BasicBus::new(registry(), "bench");
        let ctx = CallContext::new();
        let mut receivers = Vec::with_capacity(subscribers);
        runtime.block_on(async {
            for _ in 0..subscribers {
                let (handler, rx) = channel(1);
                bus.subscribe(&ctx, &[], &[app()], handler).await.unwrap();
                receivers.push(rx);
            }
        });

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("fan_out", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    bus.publish(vec![Event::builder("as.up.data.forward")
                        .identifier(app())
                        .build()])
                })
            },
        );
        ctx.cancel();
    }
    group.finish();
}

fn bench_history(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("history-store");

    let store = MemoryHistoryStore::new(BasicBus::new(registry(), "bench"), StoreConfig::default());
    group.bench_function("publish", |b| {
        b.iter(|| store.publish(vec![uplink("corr:bench")]))
    });

    let ctx = CallContext::new();
    for tail in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("fetch_tail", tail), &tail, |b, &tail| {
            b.iter(|| {
                runtime
                    .block_on(store.fetch_history(&ctx, &[], &[app()], None, tail))
                    .map(|events| black_box(events.len()))
            })
        });
    }
    group.finish();
}

fn bench_pattern_expansion(c: &mut Criterion) {
    let registry = registry();
    c.bench_function("expand_patterns", |b| {
        b.iter(|| black_box(registry.expand_patterns(&["as.up.*", "gs.*", "cluster.peer.[j]oin"])))
    });
}

criterion_group!(benches, bench_publish_fan_out, bench_history, bench_pattern_expansion);
criterion_main!(benches);
