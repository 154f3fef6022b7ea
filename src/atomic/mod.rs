//! Narrow unmanaged atomic cells.
//!
//! A [`PodCell`] stores any bitwise-copyable value no wider than the machine
//! word by reinterpreting its bytes as a native atomic integer, so every
//! operation bottoms out in a single hardware load/store/CAS instruction.
//! Values wider than the word belong in [`WideCell`](crate::WideCell).

mod numeric;
mod pod;

pub use pod::PodCell;
