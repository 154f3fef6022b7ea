//! Construction-time failures.

use thiserror::Error;

/// A narrow cell was asked to hold a type wider than the machine word.
///
/// Hardware compare-and-swap only covers word-sized operands, so
/// [`PodCell`](crate::PodCell) refuses oversized types at construction
/// rather than silently truncating them. Values that do not fit belong in a
/// [`WideCell`](crate::WideCell), which trades the single-instruction CAS
/// for a reader/writer spin-lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "`{type_name}` is {size} bytes, wider than the {max}-byte machine word; \
     store it in a `WideCell` instead"
)]
pub struct SizeError {
    /// Name of the offending value type.
    pub type_name: &'static str,
    /// Size of the offending value type in bytes.
    pub size: usize,
    /// Maximum size a narrow cell can hold on this target.
    pub max: usize,
}

impl SizeError {
    pub(crate) fn for_type<T>() -> Self {
        Self {
            type_name: core::any::type_name::<T>(),
            size: core::mem::size_of::<T>(),
            max: core::mem::size_of::<usize>(),
        }
    }
}
