//! Exchange atomicity: racing swaps and conditional exchanges must conserve
//! values (every value is observed exactly once) and pick exactly one winner.

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use casket::{ArcCell, FlagCell, PodCell};

/// Each racing thread swaps a distinct value in and keeps what it got back.
/// Swap atomicity means the initial value plus all swapped-in values are a
/// permutation of all swapped-out values plus the final value.
#[test]
fn racing_swaps_conserve_values() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 1_000;

    let cell = PodCell::new(0u64);
    let taken = Mutex::new(Vec::new());

    thread::scope(|s| {
        for t in 0..THREADS {
            let cell = &cell;
            let taken = &taken;
            s.spawn(move || {
                let mut mine = Vec::with_capacity(PER_THREAD as usize);
                for i in 0..PER_THREAD {
                    // Distinct nonzero values per thread.
                    let value = 1 + t * PER_THREAD + i;
                    mine.push(cell.swap(value).previous);
                }
                taken.lock().unwrap().extend(mine);
            });
        }
    });

    let mut all = taken.into_inner().unwrap();
    all.push(cell.load());
    all.sort_unstable();
    let expected: Vec<u64> = (0..=THREADS * PER_THREAD).collect();
    assert_eq!(all, expected);
}

/// Exactly one of many racing conditional exchanges may win.
#[test]
fn conditional_exchange_has_a_single_winner() {
    const THREADS: u32 = 16;

    let cell = PodCell::new(0u32);
    let winners = PodCell::new(0u32);

    thread::scope(|s| {
        for t in 1..=THREADS {
            let cell = &cell;
            let winners = &winners;
            s.spawn(move || {
                if cell.compare_exchange(t, 0).exchanged {
                    winners.increment();
                }
            });
        }
    });

    assert_eq!(winners.load(), 1);
    assert_ne!(cell.load(), 0);
}

/// The boolean latch is a one-winner race too.
#[test]
fn flag_latch_flips_for_exactly_one_thread() {
    let flag = FlagCell::new(false);
    let winners = PodCell::new(0u32);

    thread::scope(|s| {
        for _ in 0..16 {
            let flag = &flag;
            let winners = &winners;
            s.spawn(move || {
                if flag.set_true() {
                    winners.increment();
                }
            });
        }
    });

    assert_eq!(winners.load(), 1);
    assert!(flag.get());
}

/// Reference swaps conserve strong counts: after the dust settles every
/// handle that went in has come back out exactly once.
#[test]
fn racing_arc_swaps_balance_refcounts() {
    let values: Vec<Arc<u64>> = (0u64..8).map(Arc::new).collect();
    let cell: ArcCell<u64> = ArcCell::empty();

    thread::scope(|s| {
        for value in &values {
            let cell = &cell;
            let value = Arc::clone(value);
            s.spawn(move || {
                for _ in 0..500 {
                    drop(cell.swap(Some(Arc::clone(&value))));
                }
            });
        }
    });

    drop(cell.swap(None));
    for value in &values {
        assert_eq!(Arc::strong_count(value), 1);
    }
}
