use core::fmt;

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::primitive::sync::{AtomicIsize, Ordering};

/// Lock state: `0` = idle, `N > 0` = N readers in-flight, `-1` = one writer.
const IDLE: isize = 0;
const WRITER: isize = -1;

/// A word-sized reader/writer spin-lock.
///
/// The entire lock is one atomic integer. Readers enter by CAS-incrementing
/// any non-negative state; a writer enters by CAS from exactly `0` to `-1`.
/// Exits are plain decrement/increment. Readers therefore interleave freely
/// while a writer excludes everyone, and the state can never go below the
/// single `-1` writer-held value.
///
/// Acquisition spins indefinitely with [`Backoff`]; there is no timeout and
/// no fairness guarantee, so sustained writer pressure can starve readers
/// (and vice versa, since a writer needs to observe the count at exactly
/// zero). That is the deliberate price of staying out of the kernel.
///
/// The lock is not reentrant: acquiring it again from code already running
/// under one of its guards deadlocks.
pub struct RwSpinLock {
    state: CachePadded<AtomicIsize>,
}

impl RwSpinLock {
    /// Creates an idle lock.
    pub fn new() -> Self {
        Self {
            state: CachePadded::new(AtomicIsize::new(IDLE)),
        }
    }

    /// Enters as a reader, spinning until no writer holds the lock.
    pub fn read(&self) -> ReadGuard<'_> {
        let backoff = Backoff::new();
        #[cfg(feature = "tracing")]
        let mut contended = false;
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state >= IDLE
                && self
                    .state
                    .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return ReadGuard { lock: self };
            }
            #[cfg(feature = "tracing")]
            if backoff.is_yielding() && !contended {
                contended = true;
                tracing::trace!(target: "casket::lock", role = "reader", "spin wait left the spin-only phase");
            }
            backoff.step();
        }
    }

    /// Enters as the writer, spinning until the lock is completely idle.
    pub fn write(&self) -> WriteGuard<'_> {
        let backoff = Backoff::new();
        #[cfg(feature = "tracing")]
        let mut contended = false;
        loop {
            if self
                .state
                .compare_exchange_weak(IDLE, WRITER, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return WriteGuard { lock: self };
            }
            #[cfg(feature = "tracing")]
            if backoff.is_yielding() && !contended {
                contended = true;
                tracing::trace!(target: "casket::lock", role = "writer", "spin wait left the spin-only phase");
            }
            backoff.step();
        }
    }

    /// Enters as a reader only if no writer currently holds the lock.
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        let state = self.state.load(Ordering::Relaxed);
        if state >= IDLE
            && self
                .state
                .compare_exchange(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            Some(ReadGuard { lock: self })
        } else {
            None
        }
    }

    /// Enters as the writer only if the lock is idle right now.
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        if self
            .state
            .compare_exchange(IDLE, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(WriteGuard { lock: self })
        } else {
            None
        }
    }
}

impl Default for RwSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RwSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load(Ordering::Relaxed);
        let mode = match state {
            WRITER => "writing",
            IDLE => "idle",
            _ => "reading",
        };
        f.debug_struct("RwSpinLock")
            .field("state", &state)
            .field("mode", &mode)
            .finish()
    }
}

/// Shared access to the data guarded by a [`RwSpinLock`].
///
/// Exit happens on `Drop` (a plain decrement), so the lock is released even
/// if code running under the guard panics.
pub struct ReadGuard<'a> {
    lock: &'a RwSpinLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

/// Exclusive access to the data guarded by a [`RwSpinLock`].
pub struct WriteGuard<'a> {
    lock: &'a RwSpinLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        // -1 -> 0; a plain increment is the writer-exit transition.
        self.lock.state.fetch_add(1, Ordering::Release);
    }
}
