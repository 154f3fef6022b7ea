use core::fmt;
use std::sync::Arc;

use super::ArcCell;
use crate::result::{Exchange, TryExchange};

/// A reference cell that defensively copies everything it returns.
///
/// `SnapshotCell` decorates an [`ArcCell`] with a caller-supplied
/// `copy(&T) -> T` function. Every read-returning operation retrieves the
/// stored reference exactly as the underlying cell would, then passes the
/// value through `copy` before handing it back, so callers only ever receive
/// independent snapshots, never the object the cell's internal pointer
/// aliases, so a caller mutating its snapshot cannot corrupt what other
/// threads read.
///
/// `copy` is applied solely at the API boundary: values used internally as
/// CAS comparands are compared raw, and the CAS mechanics are exactly those
/// of [`ArcCell`].
///
/// # Examples
///
/// ```
/// use casket::SnapshotCell;
/// use std::sync::Arc;
///
/// let cell = SnapshotCell::with_clone(Some(Arc::new(vec![1, 2])));
/// let mut snapshot = cell.get().unwrap();
/// snapshot.push(3); // mutates the copy only
/// assert_eq!(cell.get().unwrap(), vec![1, 2]);
/// ```
pub struct SnapshotCell<T> {
    inner: ArcCell<T>,
    copy: Box<dyn Fn(&T) -> T + Send + Sync>,
}

impl<T> SnapshotCell<T> {
    /// Creates a cell that snapshots through `copy` on every read.
    pub fn new(value: Option<Arc<T>>, copy: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        Self {
            inner: ArcCell::new(value),
            copy: Box::new(copy),
        }
    }

    /// Creates a cell whose defensive copy is `T::clone`.
    pub fn with_clone(value: Option<Arc<T>>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::new(value, T::clone)
    }

    fn snap(&self, value: Option<&T>) -> Option<T> {
        value.map(|v| (self.copy)(v))
    }

    fn snap_exchange(&self, ex: Exchange<Option<Arc<T>>>) -> Exchange<Option<T>> {
        Exchange::new(self.snap(ex.previous.as_deref()), self.snap(ex.current.as_deref()))
    }

    fn snap_try(&self, res: TryExchange<Option<Arc<T>>>) -> TryExchange<Option<T>> {
        if res.exchanged {
            TryExchange::exchanged(
                self.snap(res.previous.as_deref()),
                self.snap(res.current.as_deref()),
            )
        } else {
            TryExchange::failed(
                self.snap(res.previous.as_deref()),
                self.snap(res.current.as_deref()),
            )
        }
    }

    /// Returns a defensive copy of the current value.
    pub fn get(&self) -> Option<T> {
        let value = self.inner.get();
        self.snap(value.as_deref())
    }

    /// Stores `value`, dropping the previous reference.
    pub fn set(&self, value: Option<Arc<T>>) {
        self.inner.set(value);
    }

    /// Replaces the stored reference, reporting copies of both sides.
    pub fn swap(&self, value: Option<Arc<T>>) -> Exchange<Option<T>> {
        let ex = self.inner.swap(value);
        self.snap_exchange(ex)
    }

    /// Identity CAS, as [`ArcCell::compare_exchange`]; the comparand is used
    /// raw, the returned values are copies.
    pub fn compare_exchange(
        &self,
        new: Option<Arc<T>>,
        comparand: Option<&Arc<T>>,
    ) -> TryExchange<Option<T>> {
        let res = self.inner.compare_exchange(new, comparand);
        self.snap_try(res)
    }

    /// Equality-contract CAS, as [`ArcCell::compare_exchange_eq`].
    pub fn compare_exchange_eq(
        &self,
        new: Option<Arc<T>>,
        comparand: Option<&T>,
    ) -> TryExchange<Option<T>>
    where
        T: PartialEq,
    {
        let res = self.inner.compare_exchange_eq(new, comparand);
        self.snap_try(res)
    }

    /// Replaces the value with `f(snapshot)`, retrying until the identity
    /// CAS wins.
    ///
    /// `f` receives a defensive copy (it may keep or mutate it freely) and
    /// returns the owned replacement; like every CAS retry loop it may run
    /// once per attempt.
    pub fn update(&self, mut f: impl FnMut(Option<T>) -> Option<T>) -> Exchange<Option<T>> {
        let ex = self
            .inner
            .update(|current| f(self.snap(current.as_deref())).map(Arc::new));
        self.snap_exchange(ex)
    }

    /// Replaces the value with `f(snapshot)` iff the cell still holds
    /// `comparand` by identity, as [`ArcCell::try_update`]; the comparand is
    /// used raw, the returned values are copies.
    pub fn try_update(
        &self,
        mut f: impl FnMut(Option<T>) -> Option<T>,
        comparand: Option<&Arc<T>>,
    ) -> TryExchange<Option<T>> {
        let res = self
            .inner
            .try_update(|current| f(self.snap(current.as_deref())).map(Arc::new), comparand);
        self.snap_try(res)
    }

    /// Replaces the value with `f(snapshot)` iff `predicate` holds for the
    /// observed value; gives up the first time the predicate fails.
    pub fn try_update_if(
        &self,
        mut f: impl FnMut(Option<T>) -> Option<T>,
        predicate: impl Fn(Option<&T>) -> bool,
    ) -> TryExchange<Option<T>> {
        let res = self
            .inner
            .try_update_if(|current| f(self.snap(current.as_deref())).map(Arc::new), predicate);
        self.snap_try(res)
    }

    /// Consumes the wrapper, returning the underlying reference cell.
    pub fn into_inner(self) -> ArcCell<T> {
        self.inner
    }
}

impl<T: Clone + Send + Sync + 'static> From<Option<Arc<T>>> for SnapshotCell<T> {
    fn from(value: Option<Arc<T>>) -> Self {
        Self::with_clone(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("value", &self.inner.get())
            .finish()
    }
}

#[cfg(all(test, not(casket_loom)))]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_independent_of_storage() {
        let cell = SnapshotCell::with_clone(Some(Arc::new(vec![1, 2, 3])));
        let mut copy = cell.get().unwrap();
        copy.push(4);
        assert_eq!(cell.get().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn custom_copy_function_is_applied_on_every_read() {
        let cell = SnapshotCell::new(Some(Arc::new(String::from("value"))), |s: &String| {
            format!("copy:{s}")
        });
        assert_eq!(cell.get().unwrap(), "copy:value");
        let ex = cell.swap(Some(Arc::new(String::from("next"))));
        assert_eq!(ex.previous.unwrap(), "copy:value");
        assert_eq!(ex.current.unwrap(), "copy:next");
    }

    #[test]
    fn comparands_are_not_copied() {
        let seen = Arc::new(5u32);
        let cell = SnapshotCell::with_clone(Some(Arc::clone(&seen)));
        // Identity CAS against the raw Arc we hold must still succeed even
        // though reads return copies.
        let res = cell.compare_exchange(None, Some(&seen));
        assert!(res.exchanged);
        assert_eq!(res.previous, Some(5));
        assert!(cell.get().is_none());
    }

    #[test]
    fn try_update_keeps_the_comparand_raw_and_copies_the_results() {
        let held = Arc::new(2u64);
        let cell = SnapshotCell::with_clone(Some(Arc::clone(&held)));

        // Identity mismatch: a distinct allocation with equal contents.
        let other = Arc::new(2u64);
        let miss = cell.try_update(|cur| cur.map(|v| v + 1), Some(&other));
        assert!(!miss.exchanged);
        assert_eq!(miss.current, Some(2));

        let hit = cell.try_update(|cur| cur.map(|v| v + 1), Some(&held));
        assert!(hit.exchanged);
        assert_eq!(hit.previous, Some(2));
        assert_eq!(hit.current, Some(3));
        assert_eq!(cell.get(), Some(3));
    }

    #[test]
    fn update_maps_over_a_snapshot() {
        let cell = SnapshotCell::with_clone(Some(Arc::new(3i64)));
        let ex = cell.update(|cur| cur.map(|v| v * 10));
        assert_eq!(ex.previous, Some(3));
        assert_eq!(ex.current, Some(30));
    }
}
