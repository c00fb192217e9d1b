use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use authn_events::{
    Dispatcher, DispatcherConfig, Event, EventHandler, EventSystem, EventsConfig, Execution,
    HandlerError, Lane, Reaction,
};

fn bench_dispatch_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_throughput");

    for workers in [1usize, 2, 4, 8].iter() {
        let jobs = 1_000u64;
        group.throughput(Throughput::Elements(jobs));
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
            b.iter(|| {
                let dispatcher = Dispatcher::start(
                    DispatcherConfig::default()
                        .with_name("bench")
                        .with_workers(workers),
                )
                .unwrap();
                let sum = Arc::new(AtomicU64::new(0));
                for i in 0..jobs {
                    let sum = sum.clone();
                    dispatcher
                        .send(move || {
                            sum.fetch_add(black_box(i), Ordering::Relaxed);
                        })
                        .unwrap();
                }
                dispatcher.close();
                black_box(sum.load(Ordering::Relaxed))
            });
        });
    }

    group.finish();
}

fn bench_bus_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_emit");
    group.throughput(Throughput::Elements(1));

    let mut system = EventSystem::new(EventsConfig {
        immediate_workers: 4,
        delayed_workers: 1,
        delay: Duration::ZERO,
    });
    system.register_topics(&["bench:tick"]).unwrap();
    let handler: Arc<dyn EventHandler> =
        Arc::new(|_: &Event| -> Result<Option<Reaction>, HandlerError> {
            Ok(Some(Box::new(|| {
                black_box(());
            })))
        });
    system
        .register_handler(Lane::Immediate, "bench", "bench:*", handler, Execution::Pooled)
        .unwrap();
    system.init().unwrap();

    group.bench_function("pooled_reaction", |b| {
        b.iter(|| {
            system
                .try_emit(Lane::Immediate, "bench:tick", serde_json::json!({ "n": 1 }))
                .unwrap()
        });
    });

    group.finish();
    system.close();
}

criterion_group!(benches, bench_dispatch_throughput, bench_bus_emit);
criterion_main!(benches);
