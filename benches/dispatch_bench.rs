use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primeworker::{count_primes, new_dispatcher, DispatchConfig, Dispatcher, Strategy};
use std::sync::mpsc;

fn bench_count_primes(c: &mut Criterion) {
    c.bench_function("count_primes_10k", |b| {
        b.iter(|| count_primes(black_box(10_000)))
    });
}

// Round trip cost of each strategy for a small bound, so overhead dominates.
fn bench_dispatch_overhead(c: &mut Criterion) {
    for strategy in [Strategy::Inline, Strategy::Thread] {
        let d = new_dispatcher(&DispatchConfig {
            strategy,
            ..Default::default()
        });
        c.bench_function(&format!("dispatch_{}_100", d.strategy()), |b| {
            b.iter(|| {
                let (tx, rx) = mpsc::channel();
                d.dispatch(black_box(100), move |n| {
                    let _ = tx.send(n);
                });
                rx.recv().unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_count_primes, bench_dispatch_overhead);
criterion_main!(benches);
