//! Reference-semantics atomic cells.
//!
//! [`ArcCell`] holds a logical `Option<Arc<T>>` in a single pointer word and
//! exchanges it with native word-sized atomics; [`SnapshotCell`] decorates it
//! so every value returned to a caller first passes through a defensive-copy
//! function.

mod arc_cell;
mod snapshot;

pub use arc_cell::ArcCell;
pub use snapshot::SnapshotCell;
