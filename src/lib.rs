//! # `casket` - Atomic Container Cells
//!
//! Lock-free and optimistically-locked atomic cells built on compare-and-swap
//! retry loops. Every cell gives shared `&self` access to a single value with
//! atomic read, write, exchange, and conditional-exchange operations, picking
//! the cheapest storage strategy its value shape allows.
//!
//! ## Storage Strategies
//!
//! 1. **Narrow** ([`PodCell`]): any `Copy` value whose bytes fit in one
//!    machine word rides directly in an `AtomicUsize`. Exchanges are single
//!    hardware CAS instructions; nothing ever blocks.
//! 2. **Wide** ([`WideCell`], [`EquatableCell`]): values wider than a word
//!    sit behind a [`RwSpinLock`], a readers-writer spin lock with no queue
//!    and no OS involvement. Many readers share; one writer excludes.
//! 3. **Shared reference** ([`ArcCell`], [`SnapshotCell`]): a logical
//!    `Option<Arc<T>>` in one pointer word, exchanged by identity with an
//!    optimistic pointer-sized critical section for reads.
//!
//! ## Shape Specializations
//!
//! [`FlagCell`] (booleans with latch semantics), [`EnumCell`] (fieldless
//! enum state machines), [`PtrCell`] (raw addresses), and [`CallbackCell`]
//! (a copy-on-write callback list) each delegate to one of the strategies
//! above and add the operations their shape calls for.
//!
//! ## Exchange Results
//!
//! Mutating operations report what happened instead of returning bare
//! values: [`Exchange`] carries the previous and new values of an
//! unconditional exchange, [`TryExchange`] adds whether a conditional one
//! took effect. On failure both of its values are the value actually
//! observed in the cell, never the comparand.
//!
//! ## Contention
//!
//! Every retry loop and spin lock in the crate shares one pacing primitive,
//! [`Backoff`]: bounded exponential spinning, then cooperative yields, then
//! short sleeps. Progress is guaranteed system-wide (some thread always
//! completes) but no operation is fair under sustained contention.
//!
//! ## Example
//!
//! ```rust
//! use casket::PodCell;
//!
//! let counter = PodCell::new(0u64);
//!
//! // Single-instruction exchange.
//! let ex = counter.fetch_add(5);
//! assert_eq!((ex.previous, ex.current), (0, 5));
//!
//! // Conditional exchange: both result values show what was observed.
//! let res = counter.compare_exchange(9, 5);
//! assert!(res.exchanged);
//! assert_eq!(counter.load(), 9);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::inline_always)]

pub mod atomic;
pub mod backoff;
pub mod cells;
pub mod error;
pub mod lock;
mod primitive;
pub mod result;
pub mod sync;

pub use atomic::PodCell;
pub use backoff::Backoff;
pub use cells::{CallbackCell, EnumCell, FlagCell, Handler, PtrCell};
pub use error::SizeError;
pub use lock::{EquatableCell, ReadGuard, RwSpinLock, WideCell, WriteGuard};
pub use result::{Exchange, TryExchange};
pub use sync::{ArcCell, SnapshotCell};

// Compile-time assertions for memory layout claims made in the docs above.
#[cfg(not(casket_loom))]
const _: () = {
    use core::mem;

    // Narrow cells are exactly one machine word.
    assert!(mem::size_of::<PodCell<u32>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<FlagCell>() == mem::size_of::<usize>());
    assert!(mem::size_of::<EnumCell<u8>>() == mem::size_of::<usize>());

    // Reference cells are one pointer word plus nothing.
    assert!(mem::size_of::<ArcCell<u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<PtrCell<u64>>() == mem::size_of::<usize>());

    // The spin lock's state pads out to a cache line to avoid false sharing,
    // so only a loose bound is useful here.
    assert!(mem::size_of::<RwSpinLock>() <= 128);
};
