use core::fmt;
use core::ptr;

use crate::backoff::Backoff;
use crate::primitive::sync::{AtomicPtr, Ordering};
use crate::result::{Exchange, TryExchange};

/// A raw pointer with atomic exchange semantics.
///
/// A shape specialization over the native `AtomicPtr`: every operation is a
/// single word-sized hardware instruction or a CAS retry loop, comparisons
/// are always by address, and null is an ordinary value like any other.
///
/// The cell stores bare addresses only; it neither owns nor dereferences
/// what they point at. Callers keep full responsibility for the pointees'
/// lifetime and for the safety of any dereference.
pub struct PtrCell<T> {
    inner: AtomicPtr<T>,
}

// SAFETY: only addresses cross the API boundary; the cell never touches the
// pointee.
unsafe impl<T> Send for PtrCell<T> {}
unsafe impl<T> Sync for PtrCell<T> {}

impl<T> PtrCell<T> {
    /// Creates a cell holding `ptr`.
    pub fn new(ptr: *mut T) -> Self {
        Self {
            inner: AtomicPtr::new(ptr),
        }
    }

    /// Creates a cell holding null.
    pub fn null() -> Self {
        Self::new(ptr::null_mut())
    }

    /// Atomically loads the current pointer (acquire).
    #[inline]
    pub fn load(&self) -> *mut T {
        self.inner.load(Ordering::Acquire)
    }

    /// Atomically stores `ptr` (release).
    #[inline]
    pub fn store(&self, ptr: *mut T) {
        self.inner.store(ptr, Ordering::Release);
    }

    /// Whether the cell currently holds null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.load().is_null()
    }

    /// Atomically replaces the pointer, reporting the previous one.
    #[inline]
    pub fn swap(&self, ptr: *mut T) -> Exchange<*mut T> {
        Exchange::new(self.inner.swap(ptr, Ordering::AcqRel), ptr)
    }

    /// Stores `new` iff the cell currently holds exactly `comparand`.
    #[inline]
    pub fn compare_exchange(&self, new: *mut T, comparand: *mut T) -> TryExchange<*mut T> {
        match self
            .inner
            .compare_exchange(comparand, new, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(previous) => TryExchange::exchanged(previous, new),
            Err(observed) => TryExchange::unchanged(observed),
        }
    }

    /// Replaces the pointer with `f(current)`, retrying until the CAS wins.
    ///
    /// `f` may run once per attempt with a stale pointer when contended.
    pub fn update(&self, mut f: impl FnMut(*mut T) -> *mut T) -> Exchange<*mut T> {
        let backoff = Backoff::new();
        let mut current = self.inner.load(Ordering::Acquire);
        loop {
            let next = f(current);
            match self
                .inner
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(previous) => return Exchange::new(previous, next),
                Err(observed) => {
                    current = observed;
                    backoff.step();
                }
            }
        }
    }

    /// Consumes the cell, returning the stored pointer.
    pub fn into_inner(self) -> *mut T {
        self.inner.into_inner()
    }
}

impl<T> Default for PtrCell<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for PtrCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtrCell").field("ptr", &self.load()).finish()
    }
}

impl<T> From<*mut T> for PtrCell<T> {
    fn from(ptr: *mut T) -> Self {
        Self::new(ptr)
    }
}
