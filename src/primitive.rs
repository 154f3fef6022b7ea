//! Switchable concurrency primitives.
//!
//! Under `--cfg casket_loom` every atomic, cell, and scheduling hint resolves
//! to its [`loom`] counterpart so the lock and cell algorithms can be model
//! checked across thread interleavings. Production builds resolve to the
//! `core`/`std` primitives with zero indirection.

#[cfg(casket_loom)]
pub(crate) mod sync {
    pub(crate) use loom::sync::atomic::{AtomicIsize, AtomicPtr, AtomicUsize, Ordering};

    pub(crate) use loom::cell::UnsafeCell;
}

#[cfg(not(casket_loom))]
pub(crate) mod sync {
    pub(crate) use core::sync::atomic::{AtomicIsize, AtomicPtr, AtomicUsize, Ordering};

    /// `UnsafeCell` with loom's closure-based access API.
    ///
    /// Mirroring loom's surface lets the lock-guarded cells compile unchanged
    /// under both configurations.
    #[repr(transparent)]
    pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        #[inline(always)]
        pub(crate) const fn new(value: T) -> Self {
            Self(core::cell::UnsafeCell::new(value))
        }

        #[inline(always)]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub(crate) fn into_inner(self) -> T {
            self.0.into_inner()
        }
    }
}

#[cfg(casket_loom)]
pub(crate) mod hint {
    pub(crate) use loom::hint::spin_loop;
    pub(crate) use loom::thread::yield_now;
}

#[cfg(not(casket_loom))]
pub(crate) mod hint {
    pub(crate) use core::hint::spin_loop;
    pub(crate) use std::thread::yield_now;
}
