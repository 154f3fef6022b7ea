//! Before/after snapshots returned by every exchange operation.
//!
//! The cells never hand out references into their own storage; each operation
//! produces one of these small immutable records, owned solely by the caller
//! and safe to move across threads without further synchronization.

/// Outcome of an unconditional exchange or update.
///
/// `previous` is the value the cell held when the operation took effect and
/// `current` is the value it holds immediately afterwards. Both are
/// snapshots; later operations on the cell do not change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Exchange<T> {
    /// Value stored before the exchange took effect.
    pub previous: T,
    /// Value stored immediately after the exchange.
    pub current: T,
}

impl<T> Exchange<T> {
    #[inline]
    pub(crate) fn new(previous: T, current: T) -> Self {
        Self { previous, current }
    }

    /// Consumes the record, returning only the pre-exchange value.
    #[inline]
    pub fn into_previous(self) -> T {
        self.previous
    }

    /// Consumes the record, returning `(previous, current)`.
    #[inline]
    pub fn into_parts(self) -> (T, T) {
        (self.previous, self.current)
    }
}

/// Outcome of a conditional exchange.
///
/// When `exchanged` is `false` the store did not happen and `current` equals
/// `previous`: both report the value actually observed in the cell at the
/// instant the condition was evaluated, never the caller's comparand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TryExchange<T> {
    /// Whether the new value was stored.
    pub exchanged: bool,
    /// Value observed in the cell when the condition was evaluated.
    pub previous: T,
    /// Value stored after the operation (`previous` if nothing was stored).
    pub current: T,
}

impl<T> TryExchange<T> {
    #[inline]
    pub(crate) fn exchanged(previous: T, current: T) -> Self {
        Self {
            exchanged: true,
            previous,
            current,
        }
    }

    #[inline]
    pub(crate) fn failed(previous: T, current: T) -> Self {
        Self {
            exchanged: false,
            previous,
            current,
        }
    }

    /// Whether the new value was stored.
    #[inline]
    pub fn is_exchanged(&self) -> bool {
        self.exchanged
    }

    /// Converts into an [`Exchange`] record if the store happened.
    #[inline]
    pub fn ok(self) -> Option<Exchange<T>> {
        if self.exchanged {
            Some(Exchange::new(self.previous, self.current))
        } else {
            None
        }
    }

    /// Consumes the record, returning the value observed before the attempt.
    #[inline]
    pub fn into_previous(self) -> T {
        self.previous
    }
}

impl<T: Clone> TryExchange<T> {
    /// Failure record observing `value`; `previous` and `current` coincide.
    #[inline]
    pub(crate) fn unchanged(value: T) -> Self {
        Self {
            exchanged: false,
            previous: value.clone(),
            current: value,
        }
    }
}
