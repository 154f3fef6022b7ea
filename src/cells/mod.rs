//! Shape specializations over the base cell machinery.
//!
//! Each of these delegates its storage and CAS logic to one of the base
//! strategies (the narrow [`PodCell`](crate::PodCell), the native
//! `AtomicPtr`, or the reference-counting [`ArcCell`](crate::ArcCell)) and
//! adds the convenience operations that value shape calls for (flip a flag,
//! step an enum, chain callbacks).

mod callback;
mod enums;
mod flag;
mod ptr;

pub use callback::{CallbackCell, Handler};
pub use enums::EnumCell;
pub use flag::FlagCell;
pub use ptr::PtrCell;
