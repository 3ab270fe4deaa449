use std::{hint::black_box, time::Duration};

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use subpub::{pubsub::Noop, Bus};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_subscribe(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let bus: Bus<Bytes> = Bus::new();
    c.bench_function("bus_subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = bus.subscribe(black_box("chan"), Noop).unwrap();
            sub.unsubscribe();
        })
    });
}

fn bench_publish_0_subs(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let bus: Bus<Bytes> = Bus::new();
    c.bench_function("publish_0_subs", |b| {
        b.iter(|| {
            bus.publish("chan", black_box(Bytes::from_static(b"x")))
                .unwrap();
        })
    });
}

/// Публикация с разным числом подписчиков. Очереди могут переполняться:
/// это тоже часть измеряемого пути `publish`.
fn bench_publish_fanout(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let mut group = c.benchmark_group("publish_fanout");

    for subs in [1usize, 10, 100] {
        let bus: Bus<Bytes> = Bus::with_capacity(1024);
        let _subs: Vec<_> = (0..subs)
            .map(|_| bus.subscribe("chan", Noop).unwrap())
            .collect();
        let payload = Bytes::from(vec![0u8; 64]);

        group.bench_with_input(BenchmarkId::from_parameter(subs), &subs, |b, _| {
            b.iter(|| bus.publish("chan", black_box(payload.clone())).unwrap())
        });

        rt.block_on(bus.close(Duration::from_secs(5))).unwrap();
    }
    group.finish();
}

fn bench_close(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("close_10_subs", |b| {
        b.to_async(&rt).iter(|| async {
            let bus: Bus<Bytes> = Bus::new();
            for _ in 0..10 {
                bus.subscribe("chan", Noop).unwrap();
            }
            bus.close(Duration::from_secs(1)).await.unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_subscribe,
    bench_publish_0_subs,
    bench_publish_fanout,
    bench_close,
);
criterion_main!(benches);
