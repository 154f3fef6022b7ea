use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use std::sync::Arc;

use crate::backoff::Backoff;
use crate::primitive::sync::{AtomicUsize, Ordering};
use crate::result::{Exchange, TryExchange};

/// Slot encoding for a logical `None`: a null pointer word.
const NONE: usize = 0;

/// Slot encoding while a reader has momentarily taken the pointer out to
/// clone it. `Arc` data pointers sit at least two counter words into a heap
/// allocation, so no real pointer can collide with this value (or with
/// `NONE`).
const HELD: usize = 1;

/// A shared heap reference with atomic exchange semantics.
///
/// The cell holds a logical `Option<Arc<T>>` in one pointer word. A stored
/// `None` is an ordinary value, not an "uninitialized" sentinel: every
/// comparison treats it like any other comparand.
///
/// Exchanges operate directly on the pointer word. Reading is optimistic:
/// the reader briefly parks the slot on a private marker, bumps the `Arc`'s
/// reference count, and puts the pointer back: a short pointer-sized
/// critical section rather than a full lock, so readers and writers spin
/// (with [`Backoff`]) only for the few instructions another thread holds the
/// marker. Conditional exchanges compare by **identity** ([`Arc::ptr_eq`])
/// unless the `_eq` variants are used, which consult `T`'s `PartialEq`
/// contract. Equality can hold between two distinct allocations, so an
/// identity-only CAS would under-swap there.
///
/// Retry-loop operations ([`update`](Self::update) and friends) are
/// ABA-safe: the loop keeps a strong reference to the value it observed, so
/// the allocation cannot be freed and its address recycled while the loop is
/// deciding.
///
/// # Examples
///
/// ```
/// use casket::ArcCell;
/// use std::sync::Arc;
///
/// let cell = ArcCell::new(Some(Arc::new(10)));
/// let seen = cell.get().unwrap();
/// assert_eq!(*seen, 10);
///
/// // Identity CAS: succeeds only against the exact Arc we observed.
/// let res = cell.compare_exchange(Some(Arc::new(11)), Some(&seen));
/// assert!(res.exchanged);
/// assert_eq!(*cell.get().unwrap(), 11);
/// ```
pub struct ArcCell<T> {
    slot: AtomicUsize,
    _value: PhantomData<Option<Arc<T>>>,
}

// SAFETY: the cell shares `Arc<T>` handles across threads, which is sound
// exactly when `Arc<T>: Send + Sync`, i.e. `T: Send + Sync`.
unsafe impl<T: Send + Sync> Send for ArcCell<T> {}
unsafe impl<T: Send + Sync> Sync for ArcCell<T> {}

/// Transfers ownership of `value` into a slot word.
fn into_raw<T>(value: Option<Arc<T>>) -> usize {
    value.map_or(NONE, |arc| Arc::into_raw(arc) as usize)
}

/// Reconstitutes ownership out of a slot word.
///
/// # Safety
///
/// `bits` must have come from [`into_raw`] and must not be reused afterwards
/// (ownership moves into the returned value).
unsafe fn from_raw<T>(bits: usize) -> Option<Arc<T>> {
    if bits == NONE {
        None
    } else {
        // SAFETY: per contract, `bits` is a pointer from `Arc::into_raw`.
        Some(unsafe { Arc::from_raw(bits as *const T) })
    }
}

/// Clones the `Arc` a slot word points at without consuming the word.
///
/// # Safety
///
/// `bits` must have come from [`into_raw`] and still own its reference.
unsafe fn clone_raw<T>(bits: usize) -> Option<Arc<T>> {
    if bits == NONE {
        None
    } else {
        // SAFETY: the word owns a reference, so the allocation is live; the
        // ManuallyDrop keeps that reference intact while we add ours.
        let arc = ManuallyDrop::new(unsafe { Arc::from_raw(bits as *const T) });
        Some(Arc::clone(&arc))
    }
}

fn ptr_eq_opt<T>(a: Option<&Arc<T>>, bits: usize) -> bool {
    a.map_or(NONE, |arc| Arc::as_ptr(arc) as usize) == bits
}

impl<T> ArcCell<T> {
    /// Creates a cell holding `value` (which may be `None`).
    pub fn new(value: Option<Arc<T>>) -> Self {
        Self {
            slot: AtomicUsize::new(into_raw(value)),
            _value: PhantomData,
        }
    }

    /// Creates a cell holding `None`.
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Takes exclusive possession of the slot word, spinning while another
    /// thread holds it.
    fn take_slot(&self) -> usize {
        let backoff = Backoff::new();
        loop {
            let bits = self.slot.swap(HELD, Ordering::Acquire);
            if bits != HELD {
                return bits;
            }
            backoff.step();
        }
    }

    /// Puts a slot word back, ending the critical section begun by
    /// [`take_slot`](Self::take_slot).
    fn release_slot(&self, bits: usize) {
        debug_assert_ne!(bits, HELD);
        self.slot.store(bits, Ordering::Release);
    }

    /// Returns a new strong reference to the current value.
    pub fn get(&self) -> Option<Arc<T>> {
        let bits = self.take_slot();
        // SAFETY: `bits` came out of the slot, which owns its reference.
        let value = unsafe { clone_raw(bits) };
        self.release_slot(bits);
        value
    }

    /// Stores `value`, dropping the previous reference.
    pub fn set(&self, value: Option<Arc<T>>) {
        drop(self.swap(value));
    }

    /// Replaces the stored reference, reporting the previous and new ones.
    pub fn swap(&self, value: Option<Arc<T>>) -> Exchange<Option<Arc<T>>> {
        let current = value.clone();
        let new_bits = into_raw(value);
        let old_bits = self.take_slot();
        self.release_slot(new_bits);
        // SAFETY: ownership of `old_bits` moves out of the slot here.
        Exchange::new(unsafe { from_raw(old_bits) }, current)
    }

    /// Stores `new` iff the cell still holds exactly `comparand`: the same
    /// allocation by identity, or `None` against `None`.
    ///
    /// On failure the returned `previous`/`current` carry a reference to the
    /// value actually observed, and `new` is dropped.
    pub fn compare_exchange(
        &self,
        new: Option<Arc<T>>,
        comparand: Option<&Arc<T>>,
    ) -> TryExchange<Option<Arc<T>>> {
        let bits = self.take_slot();
        if ptr_eq_opt(comparand, bits) {
            let current = new.clone();
            self.release_slot(into_raw(new));
            // SAFETY: ownership of `bits` moves out of the slot here.
            TryExchange::exchanged(unsafe { from_raw(bits) }, current)
        } else {
            // SAFETY: the slot still owns `bits`; we only add a reference.
            let observed = unsafe { clone_raw(bits) };
            self.release_slot(bits);
            TryExchange::unchanged(observed)
        }
    }

    /// Stores `new` iff the current value equals `comparand` by `T`'s
    /// equality contract.
    ///
    /// Two distinct allocations holding equal values compare equal here,
    /// where [`compare_exchange`](Self::compare_exchange) would refuse. A
    /// stored `None` only matches a `None` comparand.
    pub fn compare_exchange_eq(
        &self,
        new: Option<Arc<T>>,
        comparand: Option<&T>,
    ) -> TryExchange<Option<Arc<T>>>
    where
        T: PartialEq,
    {
        let bits = self.take_slot();
        let matches = match comparand {
            // SAFETY: the slot owns `bits`, so the pointee is live for the
            // duration of this critical section.
            Some(c) => bits != NONE && unsafe { *(bits as *const T) == *c },
            None => bits == NONE,
        };
        if matches {
            let current = new.clone();
            self.release_slot(into_raw(new));
            // SAFETY: ownership of `bits` moves out of the slot here.
            TryExchange::exchanged(unsafe { from_raw(bits) }, current)
        } else {
            // SAFETY: the slot still owns `bits`; we only add a reference.
            let observed = unsafe { clone_raw(bits) };
            self.release_slot(bits);
            TryExchange::unchanged(observed)
        }
    }

    /// Replaces the value with `f(current)`, retrying until an identity CAS
    /// wins.
    ///
    /// `f` may run once per attempt with a stale snapshot when the cell is
    /// contended; it receives (and the result reports) the actual `Arc`
    /// references involved, with no copying of `T`.
    pub fn update(
        &self,
        mut f: impl FnMut(Option<Arc<T>>) -> Option<Arc<T>>,
    ) -> Exchange<Option<Arc<T>>> {
        let backoff = Backoff::new();
        loop {
            let current = self.get();
            let next = f(current.clone());
            let res = self.compare_exchange(next.clone(), current.as_ref());
            if res.exchanged {
                return Exchange::new(res.previous, next);
            }
            backoff.step();
        }
    }

    /// Replaces the value with `f(current)` iff the cell still holds
    /// `comparand` by identity; gives up the first time it observes a
    /// different reference.
    pub fn try_update(
        &self,
        mut f: impl FnMut(Option<Arc<T>>) -> Option<Arc<T>>,
        comparand: Option<&Arc<T>>,
    ) -> TryExchange<Option<Arc<T>>> {
        let cmp_bits = comparand.map_or(NONE, |arc| Arc::as_ptr(arc) as usize);
        let backoff = Backoff::new();
        loop {
            let current = self.get();
            if current.as_ref().map_or(NONE, |arc| Arc::as_ptr(arc) as usize) != cmp_bits {
                return TryExchange::unchanged(current);
            }
            let next = f(current.clone());
            let res = self.compare_exchange(next.clone(), current.as_ref());
            if res.exchanged {
                return TryExchange::exchanged(res.previous, next);
            }
            backoff.step();
        }
    }

    /// Replaces the value with `f(current)` iff `predicate` holds for the
    /// observed value; gives up the first time the predicate fails.
    pub fn try_update_if(
        &self,
        mut f: impl FnMut(Option<Arc<T>>) -> Option<Arc<T>>,
        predicate: impl Fn(Option<&T>) -> bool,
    ) -> TryExchange<Option<Arc<T>>> {
        let backoff = Backoff::new();
        loop {
            let current = self.get();
            if !predicate(current.as_deref()) {
                return TryExchange::unchanged(current);
            }
            let next = f(current.clone());
            let res = self.compare_exchange(next.clone(), current.as_ref());
            if res.exchanged {
                return TryExchange::exchanged(res.previous, next);
            }
            backoff.step();
        }
    }

    /// Consumes the cell, returning the stored reference.
    pub fn into_inner(self) -> Option<Arc<T>> {
        let this = ManuallyDrop::new(self);
        // No other thread can hold the slot: we own `self` exclusively.
        let bits = this.slot.load(Ordering::Acquire);
        // SAFETY: ownership of `bits` moves out of the forgotten cell.
        unsafe { from_raw(bits) }
    }
}

impl<T> Drop for ArcCell<T> {
    fn drop(&mut self) {
        let bits = self.slot.load(Ordering::Acquire);
        // SAFETY: exclusive access via `&mut self`; the slot's reference is
        // released exactly once here.
        drop(unsafe { from_raw::<T>(bits) });
    }
}

impl<T> Default for ArcCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for ArcCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCell").field("value", &self.get()).finish()
    }
}
