use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr;

use zerocopy::AsBytes;

use crate::backoff::Backoff;
use crate::error::SizeError;
use crate::primitive::sync::{AtomicUsize, Ordering};
use crate::result::{Exchange, TryExchange};

/// Packs a value's bytes into a machine word, zero-filling the tail.
///
/// The `AsBytes` bound guarantees `T` has no padding, so the packed word
/// captures every significant byte and nothing uninitialized.
#[inline]
fn pack<T: AsBytes>(value: &T) -> usize {
    let mut buf = [0u8; mem::size_of::<usize>()];
    let bytes = value.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    usize::from_ne_bytes(buf)
}

/// Recovers a value from a packed machine word.
///
/// # Safety
///
/// `raw` must have been produced by [`pack`] from a valid `T`; the unpacked
/// bytes are then exactly the bytes of that earlier value.
#[inline]
unsafe fn unpack<T: Copy>(raw: usize) -> T {
    let buf = raw.to_ne_bytes();
    // SAFETY: the first `size_of::<T>()` bytes of `buf` are verbatim the
    // bytes of a previously packed valid `T`, per the caller's contract.
    unsafe { ptr::read_unaligned(buf.as_ptr().cast::<T>()) }
}

/// A word-sized bitwise-copyable value with lock-free atomic access.
///
/// The cell reinterprets the value's bytes as a native atomic integer, so
/// [`load`](Self::load) and [`store`](Self::store) are single acquire/release
/// instructions (never torn) and every exchange is either one hardware CAS or
/// a CAS retry loop paced by [`Backoff`]. All operations are lock-free; the
/// plain load/store/swap paths are wait-free.
///
/// `T` must be `Copy` and [`AsBytes`] (no padding bytes) and no wider than
/// the machine word; construction fails otherwise, it never truncates. The
/// word holds the raw byte pattern: conditional exchanges compare bits by
/// default, which for types like floats is not the same relation as
/// `PartialEq` (`NaN != NaN`, `-0.0 == 0.0`). Use
/// [`compare_exchange_eq`](Self::compare_exchange_eq) when the value type's
/// equality contract must decide success.
///
/// # Examples
///
/// ```
/// use casket::PodCell;
///
/// let cell = PodCell::new(41u32);
/// let ex = cell.update(|v| v + 1);
/// assert_eq!((ex.previous, ex.current), (41, 42));
/// assert_eq!(cell.load(), 42);
/// ```
pub struct PodCell<T> {
    raw: AtomicUsize,
    _value: PhantomData<T>,
}

// SAFETY: the cell hands out owned copies of `T`, never references into its
// storage; sharing it only moves `T` values between threads.
unsafe impl<T: Send> Send for PodCell<T> {}
unsafe impl<T: Send> Sync for PodCell<T> {}

impl<T: Copy + AsBytes> PodCell<T> {
    /// Creates a cell holding `value`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is wider than the machine word; the message names the
    /// type and its size. Use [`try_new`](Self::try_new) to handle the
    /// violation as a value.
    pub fn new(value: T) -> Self {
        match Self::try_new(value) {
            Ok(cell) => cell,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a cell holding `value`, failing if `T` exceeds the word size.
    ///
    /// # Errors
    ///
    /// Returns [`SizeError`] when `size_of::<T>() > size_of::<usize>()`.
    pub fn try_new(value: T) -> Result<Self, SizeError> {
        if mem::size_of::<T>() > mem::size_of::<usize>() {
            return Err(SizeError::for_type::<T>());
        }
        Ok(Self {
            raw: AtomicUsize::new(pack(&value)),
            _value: PhantomData,
        })
    }

    /// Atomically loads the current value (acquire).
    #[inline]
    pub fn load(&self) -> T {
        // SAFETY: `raw` only ever holds words packed from valid `T` values.
        unsafe { unpack(self.raw.load(Ordering::Acquire)) }
    }

    /// Atomically stores `value` (release).
    #[inline]
    pub fn store(&self, value: T) {
        self.raw.store(pack(&value), Ordering::Release);
    }

    /// Atomically replaces the value, reporting the previous one.
    #[inline]
    pub fn swap(&self, value: T) -> Exchange<T> {
        let prev = self.raw.swap(pack(&value), Ordering::AcqRel);
        // SAFETY: see `load`.
        Exchange::new(unsafe { unpack(prev) }, value)
    }

    /// Stores `new` iff the current bit pattern equals `comparand`'s.
    ///
    /// This is one hardware CAS on the packed word. On failure the returned
    /// `previous`/`current` report the value actually observed, never the
    /// comparand.
    #[inline]
    pub fn compare_exchange(&self, new: T, comparand: T) -> TryExchange<T> {
        match self.raw.compare_exchange(
            pack(&comparand),
            pack(&new),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: see `load`.
            Ok(prev) => TryExchange::exchanged(unsafe { unpack(prev) }, new),
            // SAFETY: see `load`.
            Err(observed) => TryExchange::unchanged(unsafe { unpack::<T>(observed) }),
        }
    }

    /// Stores `new` iff the current value equals `comparand` by `PartialEq`.
    ///
    /// Distinct bit patterns can compare equal (and `NaN` bit patterns
    /// compare unequal to themselves), so this runs a CAS retry loop that
    /// re-evaluates the equality contract against each observed value rather
    /// than trusting a single bitwise CAS.
    pub fn compare_exchange_eq(&self, new: T, comparand: T) -> TryExchange<T>
    where
        T: PartialEq,
    {
        self.try_update_if(|_| new, |current| current == comparand)
    }

    /// Replaces the value with `f(current)`, retrying until the CAS wins.
    ///
    /// `f` runs at least once per attempt and may observe stale inputs when
    /// the cell is contended; it must be idempotent with respect to
    /// externally visible effects. It must not call back into this cell.
    #[inline]
    pub fn update(&self, mut f: impl FnMut(T) -> T) -> Exchange<T> {
        let backoff = Backoff::new();
        let mut bits = self.raw.load(Ordering::Acquire);
        loop {
            // SAFETY: see `load`.
            let current = unsafe { unpack::<T>(bits) };
            let next = f(current);
            match self.raw.compare_exchange_weak(
                bits,
                pack(&next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Exchange::new(current, next),
                Err(observed) => {
                    bits = observed;
                    backoff.step();
                }
            }
        }
    }

    /// Replaces the value with `f(current)` iff it still equals `comparand`.
    ///
    /// Retries lost CAS races, but gives up without storing as soon as an
    /// observed value no longer equals `comparand` by `PartialEq`.
    pub fn try_update(&self, f: impl FnMut(T) -> T, comparand: T) -> TryExchange<T>
    where
        T: PartialEq,
    {
        self.try_update_if(f, |current| current == comparand)
    }

    /// Replaces the value with `f(current)` iff `predicate(current)` holds.
    ///
    /// Retries lost CAS races; reports failure (and stores nothing) the
    /// first time an observed value fails the predicate. `f` and `predicate`
    /// may run once per attempt, like [`update`](Self::update).
    pub fn try_update_if(
        &self,
        mut f: impl FnMut(T) -> T,
        predicate: impl Fn(T) -> bool,
    ) -> TryExchange<T> {
        let backoff = Backoff::new();
        let mut bits = self.raw.load(Ordering::Acquire);
        loop {
            // SAFETY: see `load`.
            let current = unsafe { unpack::<T>(bits) };
            if !predicate(current) {
                return TryExchange::failed(current, current);
            }
            let next = f(current);
            match self.raw.compare_exchange_weak(
                bits,
                pack(&next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return TryExchange::exchanged(current, next),
                Err(observed) => {
                    bits = observed;
                    backoff.step();
                }
            }
        }
    }

    /// Replaces the value with `f(current)`, spin-waiting until
    /// `predicate(current)` holds.
    ///
    /// The spinning counterpart of [`try_update_if`](Self::try_update_if):
    /// instead of reporting failure it keeps re-reading (with backoff) until
    /// it observes a value satisfying the predicate and wins the CAS on it.
    /// The wait is unbounded; impose deadlines externally if needed.
    pub fn update_when(
        &self,
        mut f: impl FnMut(T) -> T,
        predicate: impl Fn(T) -> bool,
    ) -> Exchange<T> {
        let backoff = Backoff::new();
        loop {
            let bits = self.raw.load(Ordering::Acquire);
            // SAFETY: see `load`.
            let current = unsafe { unpack::<T>(bits) };
            if !predicate(current) {
                backoff.step();
                continue;
            }
            let next = f(current);
            match self.raw.compare_exchange_weak(
                bits,
                pack(&next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Exchange::new(current, next),
                Err(_) => backoff.step(),
            }
        }
    }

    /// Consumes the cell, returning the stored value.
    pub fn into_inner(self) -> T {
        // SAFETY: see `load`.
        unsafe { unpack(self.raw.into_inner()) }
    }
}

impl<T: Copy + AsBytes + Default> Default for PodCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + AsBytes + fmt::Debug> fmt::Debug for PodCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodCell").field("value", &self.load()).finish()
    }
}

impl<T: Copy + AsBytes> From<T> for PodCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(feature = "serde")]
impl<T: Copy + AsBytes + serde::Serialize> serde::Serialize for PodCell<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.load().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Copy + AsBytes + serde::Deserialize<'de>> serde::Deserialize<'de> for PodCell<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = T::deserialize(deserializer)?;
        Self::try_new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_bytes_round_trip_verbatim() {
        #[derive(Clone, Copy, PartialEq, Debug, zerocopy::AsBytes)]
        #[repr(C)]
        struct Pair {
            lo: u16,
            hi: u16,
        }

        let cell = PodCell::new(Pair { lo: 0xBEEF, hi: 0xCAFE });
        assert_eq!(cell.load(), Pair { lo: 0xBEEF, hi: 0xCAFE });
    }

    #[test]
    fn oversized_type_is_rejected() {
        let err = PodCell::try_new([0u8; 64]).unwrap_err();
        assert_eq!(err.size, 64);
        assert_eq!(err.max, core::mem::size_of::<usize>());
    }

    #[test]
    #[should_panic(expected = "wider than")]
    fn oversized_type_panics_in_new() {
        let _ = PodCell::new([0u8; 64]);
    }

    #[test]
    fn compare_exchange_reports_observed_value_on_failure() {
        let cell = PodCell::new(5u64);
        let miss = cell.compare_exchange(9, 7);
        assert!(!miss.exchanged);
        assert_eq!(miss.previous, 5);
        assert_eq!(miss.current, 5);
        assert_eq!(cell.load(), 5);

        let hit = cell.compare_exchange(9, 5);
        assert!(hit.exchanged);
        assert_eq!((hit.previous, hit.current), (5, 9));
    }

    #[test]
    fn bitwise_cas_misses_nan_but_eq_loop_handles_negative_zero() {
        let cell = PodCell::new(-0.0f64);
        // -0.0 and 0.0 differ bitwise, so the raw CAS refuses...
        assert!(!cell.compare_exchange(1.0, 0.0).exchanged);
        // ...while the equality-contract variant swaps.
        assert!(cell.compare_exchange_eq(1.0, 0.0).exchanged);
        assert_eq!(cell.load(), 1.0);
    }

    #[test]
    fn try_update_if_fails_without_storing() {
        let cell = PodCell::new(10u32);
        let res = cell.try_update_if(|v| v * 2, |v| v > 100);
        assert!(!res.exchanged);
        assert_eq!(res.previous, 10);
        assert_eq!(cell.load(), 10);
    }

    #[test]
    fn zero_sized_values_are_fine() {
        let cell = PodCell::new(());
        cell.store(());
        let ((), ()) = cell.swap(()).into_parts();
        cell.into_inner();
    }
}
