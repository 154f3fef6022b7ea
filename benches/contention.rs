//! Multi-thread contention profiles: CAS retry loops vs lock-guarded cells.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Mutex;
use std::thread;

use casket::{PodCell, WideCell};

const PER_THREAD: u64 = 2_000;

fn contended_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_counter");
    group.sample_size(20);

    for threads in [2u64, 4, 8] {
        group.bench_function(format!("pod_cell_{threads}_threads"), |b| {
            b.iter(|| {
                let cell = PodCell::new(0u64);
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..PER_THREAD {
                                cell.fetch_add(1);
                            }
                        });
                    }
                });
                assert_eq!(cell.load(), threads * PER_THREAD);
            });
        });

        group.bench_function(format!("std_mutex_{threads}_threads"), |b| {
            b.iter(|| {
                let cell = Mutex::new(0u64);
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..PER_THREAD {
                                *cell.lock().unwrap() += 1;
                            }
                        });
                    }
                });
                assert_eq!(*cell.lock().unwrap(), threads * PER_THREAD);
            });
        });
    }

    group.finish();
}

fn readers_vs_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers_vs_writer");
    group.sample_size(20);

    group.bench_function("wide_cell_3r_1w", |b| {
        b.iter(|| {
            let cell = WideCell::new([0u64; 4]);
            thread::scope(|s| {
                s.spawn(|| {
                    for n in 1..=PER_THREAD {
                        cell.store([n; 4]);
                    }
                });
                for _ in 0..3 {
                    s.spawn(|| {
                        loop {
                            let seen = cell.load();
                            black_box(seen);
                            if seen[0] == PER_THREAD {
                                break;
                            }
                        }
                    });
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, contended_counter, readers_vs_writer);
criterion_main!(benches);
