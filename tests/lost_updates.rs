//! Lost-update tests: every cell's `update` family must apply each
//! read-modify-write exactly once no matter how many threads race.

use std::sync::Arc;
use std::thread;

use casket::{ArcCell, EquatableCell, PodCell, WideCell};

const THREADS: usize = 8;
const PER_THREAD: usize = 2_000;

#[test]
fn pod_cell_update_loses_nothing() {
    let counter = PodCell::new(0usize);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    counter.update(|v| v + 1);
                }
            });
        }
    });
    assert_eq!(counter.load(), THREADS * PER_THREAD);
}

#[test]
fn pod_cell_fetch_add_loses_nothing() {
    let counter = PodCell::new(0u64);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    counter.fetch_add(1);
                }
            });
        }
    });
    assert_eq!(counter.load(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn wide_cell_update_loses_nothing() {
    // A value wide enough that it cannot ride in a machine word.
    let counter = WideCell::new([0u64; 4]);
    thread::scope(|s| {
        let counter = &counter;
        for lane in 0..4 {
            for _ in 0..2 {
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        counter.update(|mut v| {
                            v[lane] += 1;
                            v
                        });
                    }
                });
            }
        }
    });
    assert_eq!(counter.load(), [2 * PER_THREAD as u64; 4]);
}

#[test]
fn equatable_cell_update_loses_nothing() {
    let counter = EquatableCell::new(0u64.to_string());
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..500 {
                    counter.update(|v| {
                        let n: u64 = v.parse().unwrap();
                        (n + 1).to_string()
                    });
                }
            });
        }
    });
    assert_eq!(counter.get(), (THREADS as u64 * 500).to_string());
}

#[test]
fn arc_cell_update_loses_nothing() {
    let counter: ArcCell<u64> = ArcCell::new(Some(Arc::new(0)));
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..500 {
                    counter.update(|cur| cur.map(|v| Arc::new(*v + 1)));
                }
            });
        }
    });
    assert_eq!(counter.get().as_deref(), Some(&(THREADS as u64 * 500)));
}

#[test]
fn guarded_updates_respect_their_bound_under_contention() {
    // try_add_below refuses to cross the ceiling even when racing.
    let gauge = PodCell::new(0u32);
    let ceiling = 1_000;
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    let _ = gauge.try_add_below(1, ceiling);
                }
            });
        }
    });
    assert_eq!(gauge.load(), ceiling);
}
