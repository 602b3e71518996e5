//! Latency benchmarks for the sizing policy.
//!
//! Every entry point here runs inside a stop-the-world pause, so per-call
//! latency is the contract that matters: a sizing decision must be noise
//! against the collection it follows.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tenura_core::{
    AccountingSnapshot, AdaptivePaddedAverage, AdaptiveSizePolicy, GcCause, HeapUsage, NanoClock,
    PolicyEvent, PolicyEventKind, PolicyEventQueue, ReciprocalLeastSquares, SizingConfig,
};

/// Deterministic clock so benches do not measure `Instant` syscalls.
struct StridingClock {
    nanos: AtomicU64,
}

impl NanoClock for StridingClock {
    fn now_nanos(&self) -> u64 {
        // 1ms per observation keeps intervals positive.
        self.nanos.fetch_add(1_000_000, Ordering::Relaxed)
    }
}

fn bench_policy(config: SizingConfig) -> AdaptiveSizePolicy {
    let clock = Arc::new(StridingClock {
        nanos: AtomicU64::new(0),
    });
    AdaptiveSizePolicy::with_clock(config, clock).unwrap()
}

const MIB: u64 = 1024 * 1024;

fn accounting() -> AccountingSnapshot {
    AccountingSnapshot {
        young_chunk_bytes: 64 * MIB,
        young_aligned_chunk_bytes: 48 * MIB,
        young_chunk_bytes_before: 60 * MIB,
        survivor_chunk_bytes: 4 * MIB,
        survivor_overflow_object_bytes: 0,
        tenured_object_bytes: 2 * MIB,
        old_generation_after_chunk_bytes: 96 * MIB,
    }
}

/// Full minor-collection callback cycle.
fn bench_minor_cycle(c: &mut Criterion) {
    let mut policy = bench_policy(SizingConfig::default());
    let snapshot = accounting();

    c.bench_function("minor_collection_cycle", |b| {
        b.iter(|| {
            policy.on_collection_begin(false, black_box(&snapshot));
            policy.on_collection_end(false, GcCause::OnAllocation, black_box(&snapshot));
        })
    });
}

/// Complete-collection decision between callbacks.
fn bench_should_collect_completely(c: &mut Criterion) {
    let mut policy = bench_policy(SizingConfig::default());
    let snapshot = accounting();
    for _ in 0..10 {
        policy.on_collection_begin(false, &snapshot);
        policy.on_collection_end(false, GcCause::OnAllocation, &snapshot);
    }
    let usage = HeapUsage {
        young_used_bytes: 48 * MIB,
        old_used_bytes: 100 * MIB,
    };

    c.bench_function("should_collect_completely", |b| {
        b.iter(|| black_box(policy.should_collect_completely(true, black_box(&usage))))
    });
}

/// Estimator update plus prediction.
fn bench_estimator(c: &mut Criterion) {
    let mut fit = ReciprocalLeastSquares::new(25);
    let mut size = 32.0 * MIB as f64;

    c.bench_function("estimator_sample_and_estimate", |b| {
        b.iter(|| {
            size += 1024.0;
            fit.sample(black_box(size), black_box(0.05 + 1e7 / size));
            black_box(fit.estimate(size))
        })
    });
}

/// Padded-average update.
fn bench_padded_average(c: &mut Criterion) {
    let mut avg = AdaptivePaddedAverage::new(10, 3);
    let mut value = 0.0;

    c.bench_function("padded_average_sample", |b| {
        b.iter(|| {
            value += 1.0;
            avg.sample(black_box(value));
            black_box(avg.padded_average())
        })
    });
}

/// Lock-free decision enqueue.
fn bench_event_enqueue(c: &mut Criterion) {
    let queue = PolicyEventQueue::new(4096);

    c.bench_function("event_enqueue", |b| {
        b.iter(|| {
            let event = PolicyEvent {
                kind: PolicyEventKind::EdenResized,
                collection: 1,
                previous: black_box(64 * MIB),
                current: 65 * MIB,
            };
            black_box(queue.enqueue(event))
        })
    });
}

criterion_group!(
    benches,
    bench_minor_cycle,
    bench_should_collect_completely,
    bench_estimator,
    bench_padded_average,
    bench_event_enqueue,
);

criterion_main!(benches);
