//! Cross-thread behavior of the shape-specialized cells.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use casket::{CallbackCell, EnumCell, PodCell, PtrCell, SnapshotCell};
use zerocopy::AsBytes;

#[derive(Clone, Copy, PartialEq, Eq, Debug, AsBytes)]
#[repr(u8)]
enum Stage {
    Pending,
    Claimed,
    Done,
}

/// Only one thread may move the state machine out of `Pending`.
#[test]
fn enum_transition_claims_exactly_once() {
    let stage = EnumCell::new(Stage::Pending);
    let claims = PodCell::new(0u32);

    thread::scope(|s| {
        for _ in 0..8 {
            let stage = &stage;
            let claims = &claims;
            s.spawn(move || {
                if stage.transition(Stage::Claimed, Stage::Pending).exchanged {
                    claims.increment();
                    stage.set(Stage::Done);
                }
            });
        }
    });

    assert_eq!(claims.load(), 1);
    assert_eq!(stage.get(), Stage::Done);
}

/// Treiber-style push through `PtrCell::update`: no node may be lost.
#[test]
fn ptr_cell_builds_a_complete_chain() {
    struct Node {
        next: *mut Node,
    }

    let head: PtrCell<Node> = PtrCell::null();
    let per_thread = 200;

    thread::scope(|s| {
        for _ in 0..4 {
            let head = &head;
            s.spawn(move || {
                for _ in 0..per_thread {
                    let node = Box::into_raw(Box::new(Node {
                        next: std::ptr::null_mut(),
                    }));
                    head.update(|current| {
                        // SAFETY: we own `node` until the CAS publishes it.
                        unsafe { (*node).next = current };
                        node
                    });
                }
            });
        }
    });

    let mut len = 0;
    let mut cursor = head.swap(std::ptr::null_mut()).previous;
    while !cursor.is_null() {
        // SAFETY: each node was published exactly once and is popped here
        // exactly once.
        let node = unsafe { Box::from_raw(cursor) };
        cursor = node.next;
        len += 1;
    }
    assert_eq!(len, 4 * per_thread);
}

#[test]
fn callbacks_fire_while_subscriptions_churn() {
    let hits = Arc::new(AtomicU32::new(0));
    let cell: CallbackCell<u32> = CallbackCell::new();

    thread::scope(|s| {
        let cell = &cell;

        s.spawn(|| {
            for n in 0..1_000u32 {
                cell.emit(&n);
            }
        });

        for _ in 0..4 {
            let hits = Arc::clone(&hits);
            s.spawn(move || {
                for _ in 0..100 {
                    let hits = Arc::clone(&hits);
                    let token = cell.subscribe(move |_| {
                        hits.fetch_add(1, Ordering::Relaxed);
                    });
                    assert!(cell.unsubscribe(&token));
                }
            });
        }
    });

    // Churn must leave no stragglers behind.
    assert!(cell.is_empty());
}

#[test]
fn snapshot_cell_hands_out_independent_copies_across_threads() {
    let cell = SnapshotCell::with_clone(Some(Arc::new(vec![0u32; 8])));
    let rounds = 1_000u32;

    thread::scope(|s| {
        let writer = s.spawn(|| {
            for n in 1..=rounds {
                cell.set(Some(Arc::new(vec![n; 8])));
            }
        });

        s.spawn(|| {
            loop {
                let mut copy = cell.get().unwrap();
                assert!(copy.iter().all(|x| *x == copy[0]));
                // Mutating the snapshot must never leak into storage.
                copy.push(u32::MAX);
                if copy[0] == rounds {
                    break;
                }
            }
        });

        writer.join().unwrap();
    });

    assert_eq!(cell.get().unwrap(), vec![rounds; 8]);
}
