use core::fmt;

use crate::atomic::PodCell;
use crate::result::TryExchange;

/// An atomic boolean switch.
///
/// A thin shape specialization of [`PodCell`] with the operations a flag
/// actually wants: one-way latches ([`set_true`](Self::set_true) /
/// [`set_false`](Self::set_false)) that report whether this call was the one
/// that flipped the switch, and [`toggle`](Self::toggle).
///
/// # Examples
///
/// ```
/// use casket::FlagCell;
///
/// let shutdown = FlagCell::new(false);
/// assert!(shutdown.set_true());  // this call flipped it
/// assert!(!shutdown.set_true()); // already set
/// assert!(shutdown.get());
/// ```
pub struct FlagCell {
    inner: PodCell<bool>,
}

impl FlagCell {
    /// Creates a flag with the given initial state.
    pub fn new(value: bool) -> Self {
        Self {
            inner: PodCell::new(value),
        }
    }

    /// Reads the current state.
    #[inline]
    pub fn get(&self) -> bool {
        self.inner.load()
    }

    /// Unconditionally sets the state.
    #[inline]
    pub fn set(&self, value: bool) {
        self.inner.store(value);
    }

    /// Latches the flag to `true`; returns whether this call flipped it.
    #[inline]
    pub fn set_true(&self) -> bool {
        self.inner.compare_exchange(true, false).exchanged
    }

    /// Latches the flag to `false`; returns whether this call flipped it.
    #[inline]
    pub fn set_false(&self) -> bool {
        self.inner.compare_exchange(false, true).exchanged
    }

    /// Inverts the flag, returning the previous state.
    #[inline]
    pub fn toggle(&self) -> bool {
        self.inner.update(|v| !v).previous
    }

    /// Stores `new` iff the flag currently reads `comparand`.
    #[inline]
    pub fn compare_exchange(&self, new: bool, comparand: bool) -> TryExchange<bool> {
        self.inner.compare_exchange(new, comparand)
    }

    /// Consumes the flag, returning its final state.
    pub fn into_inner(self) -> bool {
        self.inner.into_inner()
    }
}

impl Default for FlagCell {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for FlagCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagCell").field("value", &self.get()).finish()
    }
}

impl From<bool> for FlagCell {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FlagCell {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FlagCell {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(bool::deserialize(deserializer)?))
    }
}
