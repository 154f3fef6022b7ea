use core::fmt;
use core::mem;

use super::rw_spin::RwSpinLock;
use crate::primitive::sync::UnsafeCell;
use crate::result::{Exchange, TryExchange};

/// A bitwise-copyable value of any size with atomic access.
///
/// Values wider than the machine word cannot be swapped by a single hardware
/// CAS, so this cell keeps the value in ordinary memory behind a
/// [`RwSpinLock`]: reads copy the value out under the reader side (torn
/// reads are impossible, readers interleave freely), and every mutation runs
/// under the writer side, fully serialized against readers and other
/// writers.
///
/// Unlike the CAS retry loops of [`PodCell`](crate::PodCell), closures
/// passed to the `update` family here run **exactly once**, under the writer
/// lock, on a value that cannot change underneath them. The flip side: a
/// closure must not touch this cell again: the lock is not reentrant and
/// the call would deadlock. A panicking closure releases the lock on the way
/// out and leaves the previous value in place.
///
/// # Examples
///
/// ```
/// use casket::WideCell;
///
/// let cell = WideCell::new([0u64; 4]);
/// cell.store([7; 4]);
/// let ex = cell.update(|mut v| {
///     v[0] += 1;
///     v
/// });
/// assert_eq!(ex.current, [8, 7, 7, 7]);
/// ```
pub struct WideCell<T> {
    lock: RwSpinLock,
    slot: UnsafeCell<T>,
}

// SAFETY: all access to `slot` happens under the appropriate side of `lock`,
// and only owned copies of `T` cross the API boundary.
unsafe impl<T: Copy + Send> Send for WideCell<T> {}
unsafe impl<T: Copy + Send> Sync for WideCell<T> {}

impl<T: Copy> WideCell<T> {
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            lock: RwSpinLock::new(),
            slot: UnsafeCell::new(value),
        }
    }

    /// Copies the current value out under the reader lock.
    #[inline]
    pub fn load(&self) -> T {
        let _guard = self.lock.read();
        // SAFETY: the reader guard excludes writers for the whole read.
        self.slot.with(|p| unsafe { *p })
    }

    /// Stores `value` under the writer lock.
    #[inline]
    pub fn store(&self, value: T) {
        let _guard = self.lock.write();
        // SAFETY: the writer guard gives exclusive access.
        self.slot.with_mut(|p| unsafe { *p = value });
    }

    /// Replaces the value, reporting the previous one.
    pub fn swap(&self, value: T) -> Exchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        let previous = self.slot.with_mut(|p| unsafe { mem::replace(&mut *p, value) });
        Exchange::new(previous, value)
    }

    /// Stores `new` iff the current value equals `comparand`.
    ///
    /// The whole check-and-set runs under the writer lock, so it is atomic
    /// with respect to every other operation on this cell.
    pub fn compare_exchange(&self, new: T, comparand: T) -> TryExchange<T>
    where
        T: PartialEq,
    {
        self.compare_exchange_if(new, |current| *current == comparand)
    }

    /// Stores `new` iff `predicate(&current)` holds, all under the writer
    /// lock.
    pub fn compare_exchange_if(
        &self,
        new: T,
        predicate: impl FnOnce(&T) -> bool,
    ) -> TryExchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            if predicate(&*p) {
                TryExchange::exchanged(mem::replace(&mut *p, new), new)
            } else {
                TryExchange::unchanged(*p)
            }
        })
    }

    /// Replaces the value with `f(current)`.
    ///
    /// `f` runs exactly once, under the writer lock; it observes a value no
    /// other thread can change until the store completes.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> Exchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            let previous = *p;
            let next = f(previous);
            *p = next;
            Exchange::new(previous, next)
        })
    }

    /// Replaces the value with `f(current)` iff it equals `comparand`.
    pub fn try_update(&self, f: impl FnOnce(T) -> T, comparand: T) -> TryExchange<T>
    where
        T: PartialEq,
    {
        self.try_update_if(f, |current| *current == comparand)
    }

    /// Replaces the value with `f(current)` iff `predicate(&current)` holds.
    ///
    /// Check, map, and store all happen under one writer-lock acquisition;
    /// `f` runs at most once.
    pub fn try_update_if(
        &self,
        f: impl FnOnce(T) -> T,
        predicate: impl FnOnce(&T) -> bool,
    ) -> TryExchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            if predicate(&*p) {
                let previous = *p;
                let next = f(previous);
                *p = next;
                TryExchange::exchanged(previous, next)
            } else {
                TryExchange::unchanged(*p)
            }
        })
    }

    /// Consumes the cell, returning the stored value.
    pub fn into_inner(self) -> T {
        self.slot.into_inner()
    }
}

impl<T: Copy + Default> Default for WideCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for WideCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WideCell").field("value", &self.load()).finish()
    }
}

#[cfg(feature = "serde")]
impl<T: Copy + serde::Serialize> serde::Serialize for WideCell<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.load().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Copy + serde::Deserialize<'de>> serde::Deserialize<'de> for WideCell<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(T::deserialize(deserializer)?))
    }
}
