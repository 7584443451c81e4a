use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diagfill::{partition, FillEngine, FillOptions, Matrix, ProgressTracker};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

/// Benchmark a full fill across worker counts
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_matrix");
    group.sample_size(20);

    let size = 1024;
    for workers in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                let engine = FillEngine::new(FillOptions {
                    workers,
                    max_value: 100_000,
                    seed: Some(7),
                });
                let mut matrix = Matrix::new(size).unwrap();

                b.iter(|| {
                    let progress = ProgressTracker::new(size as u64);
                    let elapsed = engine.run(black_box(&mut matrix), &progress).unwrap();
                    black_box(elapsed)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the progress hot path under contention
fn bench_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress_report");

    let rows = 100_000u64;
    for n_threads in [1u64, 4, 8] {
        group.throughput(Throughput::Elements(rows));

        group.bench_with_input(
            BenchmarkId::new("threads", n_threads),
            &n_threads,
            |b, &n_threads| {
                b.iter(|| {
                    let progress = Arc::new(ProgressTracker::new(rows));
                    let handles: Vec<_> = (0..n_threads)
                        .map(|_| {
                            let progress = Arc::clone(&progress);
                            thread::spawn(move || {
                                let threshold = progress.threshold();
                                for _ in 0..rows / n_threads {
                                    progress.report(1);
                                    progress.maybe_flush(threshold);
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                    progress.drain();
                    black_box(progress.visible_percent())
                })
            },
        );
    }

    group.finish();
}

/// Benchmark row partitioning
fn bench_partition(c: &mut Criterion) {
    c.bench_function("partition_1m_rows_64_workers", |b| {
        b.iter(|| partition(black_box(1_000_000), black_box(64)))
    });
}

criterion_group!(benches, bench_fill, bench_progress, bench_partition);
criterion_main!(benches);
