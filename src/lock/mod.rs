//! Optimistically-locked cells for values wider than the machine word.
//!
//! No hardware CAS covers arbitrarily large operands, so these cells guard
//! plain memory with [`RwSpinLock`]: a one-word reader-count spin-lock.
//! [`WideCell`] handles any-size bitwise-copyable values; [`EquatableCell`]
//! handles arbitrary clonable values with an equality contract.

mod equatable;
mod rw_spin;
mod wide;

pub use equatable::EquatableCell;
pub use rw_spin::{ReadGuard, RwSpinLock, WriteGuard};
pub use wide::WideCell;
