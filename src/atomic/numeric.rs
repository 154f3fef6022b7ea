//! Numeric fast paths for [`PodCell`].
//!
//! These compute the replacement value with the operator directly inside the
//! CAS retry loop, skipping the generic closure plumbing of
//! [`PodCell::update`]. Arithmetic misbehavior is the operator's own:
//! division by zero panics, and overflow panics in debug builds and wraps in
//! release builds. The cell never catches or retries either.

use num_traits::PrimInt;
use zerocopy::AsBytes;

use super::PodCell;
use crate::result::{Exchange, TryExchange};

impl<T: Copy + AsBytes + PrimInt> PodCell<T> {
    /// Atomically adds `delta`, reporting the previous and new values.
    #[inline]
    pub fn fetch_add(&self, delta: T) -> Exchange<T> {
        self.update(|v| v + delta)
    }

    /// Atomically subtracts `delta`.
    #[inline]
    pub fn fetch_sub(&self, delta: T) -> Exchange<T> {
        self.update(|v| v - delta)
    }

    /// Atomically multiplies by `factor`.
    #[inline]
    pub fn fetch_mul(&self, factor: T) -> Exchange<T> {
        self.update(|v| v * factor)
    }

    /// Atomically divides by `divisor`.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero; the cell is left unchanged.
    #[inline]
    pub fn fetch_div(&self, divisor: T) -> Exchange<T> {
        self.update(|v| v / divisor)
    }

    /// Atomically adds one.
    #[inline]
    pub fn increment(&self) -> Exchange<T> {
        self.fetch_add(T::one())
    }

    /// Atomically subtracts one.
    #[inline]
    pub fn decrement(&self) -> Exchange<T> {
        self.fetch_sub(T::one())
    }

    /// Raises the stored value to `value` if it is currently smaller.
    ///
    /// When the current value is already `>= value` no CAS is attempted and
    /// the returned record shows `previous == current`.
    pub fn fetch_max(&self, value: T) -> Exchange<T> {
        let res = self.try_update_if(|_| value, |current| current < value);
        Exchange::new(res.previous, res.current)
    }

    /// Lowers the stored value to `value` if it is currently larger.
    pub fn fetch_min(&self, value: T) -> Exchange<T> {
        let res = self.try_update_if(|_| value, |current| current > value);
        Exchange::new(res.previous, res.current)
    }

    /// Adds `delta` only while the current value is below `bound`.
    ///
    /// Reports failure (storing nothing) the first time a value `>= bound`
    /// is observed; otherwise behaves like [`fetch_add`](Self::fetch_add).
    pub fn try_add_below(&self, delta: T, bound: T) -> TryExchange<T> {
        self.try_update_if(|v| v + delta, |current| current < bound)
    }

    /// Subtracts `delta` only while the current value is above `bound`.
    pub fn try_sub_above(&self, delta: T, bound: T) -> TryExchange<T> {
        self.try_update_if(|v| v - delta, |current| current > bound)
    }

    /// Adds `delta`, spin-waiting until the current value drops below
    /// `bound`.
    ///
    /// The blocking counterpart of [`try_add_below`](Self::try_add_below);
    /// the wait is an unbounded backoff spin.
    pub fn add_when_below(&self, delta: T, bound: T) -> Exchange<T> {
        self.update_when(|v| v + delta, |current| current < bound)
    }

    /// Subtracts `delta`, spin-waiting until the current value rises above
    /// `bound`.
    pub fn sub_when_above(&self, delta: T, bound: T) -> Exchange<T> {
        self.update_when(|v| v - delta, |current| current > bound)
    }
}
