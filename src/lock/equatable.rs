use core::fmt;
use core::mem;

use super::rw_spin::RwSpinLock;
use crate::primitive::sync::UnsafeCell;
use crate::result::{Exchange, TryExchange};

/// An arbitrarily large, equality-aware value with atomic access.
///
/// The general-purpose cell: `T` only needs `Clone` (reads copy the value
/// out) and `PartialEq` (conditional exchanges decide by the value-equality
/// contract rather than bits or identity). Storage and locking discipline
/// are the same as [`WideCell`](crate::WideCell), a [`RwSpinLock`] around
/// plain memory, but the stored value may own heap data, and comparands are
/// taken by reference so nothing is copied just to compare.
///
/// Closures passed to the `update` family run exactly once, under the writer
/// lock. They must not touch this cell again (the lock is not reentrant); a
/// panicking closure releases the lock and leaves the previous value in
/// place.
///
/// Sharing the cell across threads requires `T: Send + Sync`, because
/// concurrent readers invoke `T::clone` and `PartialEq` through a shared
/// `&T`. Types with non-thread-safe interior mutability are rejected:
///
/// ```compile_fail
/// use casket::EquatableCell;
/// use std::cell::RefCell;
///
/// fn assert_sync<T: Sync>(_: &T) {}
///
/// // RefCell is Send + Clone + PartialEq but not Sync; the cell must not be
/// // shareable, or two readers would race on the borrow flag.
/// let cell = EquatableCell::new(RefCell::new(0u32));
/// assert_sync(&cell);
/// ```
///
/// # Examples
///
/// ```
/// use casket::EquatableCell;
///
/// let cell = EquatableCell::new(String::from("draft"));
/// let res = cell.compare_exchange(String::from("final"), "draft");
/// assert!(res.exchanged);
/// assert_eq!(cell.get(), "final");
/// ```
pub struct EquatableCell<T> {
    lock: RwSpinLock,
    slot: UnsafeCell<T>,
}

// SAFETY: mutation happens only under the writer side of `lock`, and values
// cross the API boundary only as clones or by move. Sharing additionally
// needs `T: Sync` (as with std's `RwLock`): concurrent readers run
// `T::clone` and `PartialEq` through a shared `&T`.
unsafe impl<T: Send> Send for EquatableCell<T> {}
unsafe impl<T: Send + Sync> Sync for EquatableCell<T> {}

impl<T: Clone + PartialEq> EquatableCell<T> {
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            lock: RwSpinLock::new(),
            slot: UnsafeCell::new(value),
        }
    }

    /// Clones the current value out under the reader lock.
    #[inline]
    pub fn get(&self) -> T {
        let _guard = self.lock.read();
        // SAFETY: the reader guard excludes writers for the whole read.
        self.slot.with(|p| unsafe { (*p).clone() })
    }

    /// Stores `value`, dropping the previous one.
    #[inline]
    pub fn set(&self, value: T) {
        drop(self.replace(value));
    }

    /// Replaces the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe { mem::replace(&mut *p, value) })
    }

    /// Replaces the value, reporting both the previous and the new value.
    pub fn swap(&self, value: T) -> Exchange<T> {
        let current = value.clone();
        Exchange::new(self.replace(value), current)
    }

    /// Stores `new` iff the current value equals `comparand`.
    ///
    /// The equality check and the store happen under one writer-lock
    /// acquisition, atomic with respect to every other operation on the
    /// cell.
    pub fn compare_exchange<C>(&self, new: T, comparand: &C) -> TryExchange<T>
    where
        T: PartialEq<C>,
        C: ?Sized,
    {
        self.compare_exchange_if(new, |current| *current == *comparand)
    }

    /// Stores `new` iff `predicate(&current)` holds, under the writer lock.
    pub fn compare_exchange_if(
        &self,
        new: T,
        predicate: impl FnOnce(&T) -> bool,
    ) -> TryExchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            if predicate(&*p) {
                let current = new.clone();
                TryExchange::exchanged(mem::replace(&mut *p, new), current)
            } else {
                TryExchange::unchanged((*p).clone())
            }
        })
    }

    /// Replaces the value with `f(&current)`.
    ///
    /// `f` runs exactly once, under the writer lock, on a value no other
    /// thread can change until the store completes.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Exchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            let next = f(&*p);
            let previous = mem::replace(&mut *p, next.clone());
            Exchange::new(previous, next)
        })
    }

    /// Replaces the value with `f(&current)` iff it equals `comparand`.
    pub fn try_update<C>(&self, f: impl FnOnce(&T) -> T, comparand: &C) -> TryExchange<T>
    where
        T: PartialEq<C>,
        C: ?Sized,
    {
        self.try_update_if(f, |current| *current == *comparand)
    }

    /// Replaces the value with `f(&current)` iff `predicate(&current)`
    /// holds; check, map, and store share one writer-lock acquisition.
    pub fn try_update_if(
        &self,
        f: impl FnOnce(&T) -> T,
        predicate: impl FnOnce(&T) -> bool,
    ) -> TryExchange<T> {
        let _guard = self.lock.write();
        // SAFETY: exclusive under the writer guard.
        self.slot.with_mut(|p| unsafe {
            if predicate(&*p) {
                let next = f(&*p);
                let previous = mem::replace(&mut *p, next.clone());
                TryExchange::exchanged(previous, next)
            } else {
                TryExchange::unchanged((*p).clone())
            }
        })
    }

    /// Consumes the cell, returning the stored value.
    pub fn into_inner(self) -> T {
        self.slot.into_inner()
    }
}

impl<T: Clone + PartialEq + Default> Default for EquatableCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for EquatableCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquatableCell").field("value", &self.get()).finish()
    }
}

#[cfg(feature = "serde")]
impl<T: Clone + PartialEq + serde::Serialize> serde::Serialize for EquatableCell<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Clone + PartialEq + serde::Deserialize<'de>> serde::Deserialize<'de>
    for EquatableCell<T>
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(T::deserialize(deserializer)?))
    }
}

#[cfg(all(test, not(casket_loom)))]
mod tests {
    use super::*;

    #[test]
    fn equality_contract_decides_success() {
        let cell = EquatableCell::new(vec![1, 2, 3]);
        // A distinct allocation with equal contents still matches.
        let res = cell.compare_exchange(vec![4, 5], &vec![1, 2, 3]);
        assert!(res.exchanged);
        assert_eq!(res.previous, vec![1, 2, 3]);
        assert_eq!(cell.get(), vec![4, 5]);

        let miss = cell.compare_exchange(vec![9], &vec![0]);
        assert!(!miss.exchanged);
        assert_eq!(miss.current, vec![4, 5]);
    }

    #[test]
    fn update_sees_a_stable_value() {
        let cell = EquatableCell::new(String::from("a"));
        let ex = cell.update(|s| format!("{s}b"));
        assert_eq!(ex.previous, "a");
        assert_eq!(ex.current, "ab");
        assert_eq!(cell.get(), "ab");
    }

    #[test]
    fn failed_try_update_stores_nothing() {
        let cell = EquatableCell::new(10u64.to_string());
        let res = cell.try_update_if(|_| String::from("changed"), |v| v == "11");
        assert!(!res.exchanged);
        assert_eq!(cell.get(), "10");
    }

    #[test]
    fn thread_safe_values_share_and_clone_concurrently() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}

        let cell = EquatableCell::new(String::from("shared"));
        assert_send_sync(&cell);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        assert_eq!(cell.get(), "shared");
                    }
                });
            }
        });
    }

    #[test]
    fn borrowed_comparands_avoid_allocation() {
        let cell = EquatableCell::new(String::from("x"));
        assert!(cell.compare_exchange(String::from("y"), "x").exchanged);
        assert!(cell.try_update(|v| format!("{v}!"), "y").exchanged);
        assert_eq!(cell.get(), "y!");
    }
}
