//! Adaptive spin/yield backoff for CAS retry loops and lock-enter loops.

use core::cell::Cell;
use core::fmt;

use crate::primitive::hint::{spin_loop, yield_now};

/// Number of exponential spin rounds before the backoff starts yielding.
const SPIN_LIMIT: u32 = 6;

/// Number of yield rounds before the backoff starts sleeping.
const YIELD_LIMIT: u32 = 10;

/// Duration of one sleep round once both spin and yield phases are exhausted.
#[cfg(not(casket_loom))]
const SLEEP_STEP: core::time::Duration = core::time::Duration::from_micros(50);

/// Adaptive backoff for spin-wait loops.
///
/// Every retry loop in this crate waits by calling [`step`](Backoff::step) on
/// a `Backoff` created for that one logical wait. Each call waits a little
/// more politely than the last: a tight exponential `spin_loop` phase first,
/// then `yield_now`, then short sleeps, so a loop that loses a few CAS races
/// stays on the CPU while a loop stuck behind a long-held lock stops
/// hammering the memory bus.
///
/// A `Backoff` is not reusable across unrelated waits; create a fresh one per
/// wait (or call [`reset`](Backoff::reset)). There is no upper bound on the
/// step count and no built-in timeout; callers that need a deadline must
/// impose one around the loop themselves.
///
/// # Examples
///
/// ```
/// use casket::Backoff;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// fn fetch_double(a: &AtomicUsize) -> usize {
///     let backoff = Backoff::new();
///     let mut cur = a.load(Ordering::Acquire);
///     loop {
///         match a.compare_exchange_weak(cur, cur * 2, Ordering::AcqRel, Ordering::Acquire) {
///             Ok(prev) => return prev,
///             Err(observed) => {
///                 cur = observed;
///                 backoff.step();
///             }
///         }
///     }
/// }
///
/// let a = AtomicUsize::new(3);
/// assert_eq!(fetch_double(&a), 3);
/// assert_eq!(a.load(Ordering::Relaxed), 6);
/// ```
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Creates a backoff in its initial (tight-spin) phase.
    #[inline]
    pub const fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Returns the backoff to its initial phase.
    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Waits once, escalating from spinning through yielding to sleeping.
    ///
    /// The first `2^0 + 2^1 + … + 2^6` iterations are raw `spin_loop` hints,
    /// the next few steps yield the thread's timeslice, and from then on each
    /// step sleeps for a few tens of microseconds. The step counter saturates
    /// instead of wrapping.
    #[inline]
    pub fn step(&self) {
        let step = self.step.get();

        if step <= SPIN_LIMIT {
            for _ in 0..1u32 << step {
                spin_loop();
            }
        } else if step <= YIELD_LIMIT {
            yield_now();
        } else {
            self.sleep_round();
        }

        self.step.set(step.saturating_add(1));
    }

    /// Returns `true` once the backoff has left the spin-only phase.
    ///
    /// Retry loops that want to fail over to a slower strategy (or emit a
    /// contention diagnostic) key off this instead of counting attempts
    /// themselves.
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step.get() > SPIN_LIMIT
    }

    #[cfg(not(casket_loom))]
    fn sleep_round(&self) {
        std::thread::sleep(SLEEP_STEP);
    }

    // loom has no notion of wall-clock sleeping; a yield explores the same
    // interleavings.
    #[cfg(casket_loom)]
    fn sleep_round(&self) {
        yield_now();
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("step", &self.step.get())
            .field("is_yielding", &self.is_yielding())
            .finish()
    }
}
