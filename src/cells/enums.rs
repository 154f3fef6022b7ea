use core::fmt;

use zerocopy::AsBytes;

use crate::atomic::PodCell;
use crate::result::{Exchange, TryExchange};

/// An atomic cell for fieldless enums and other small discriminant types.
///
/// A shape specialization of [`PodCell`]: the enum's discriminant bytes ride
/// in the machine word, so state transitions are single hardware CAS
/// operations. `E` needs an explicit `repr` and [`AsBytes`] (derivable for
/// fieldless enums), which rules out discriminant patterns the cell could
/// not faithfully reproduce.
///
/// # Examples
///
/// ```
/// use casket::EnumCell;
/// use zerocopy::AsBytes;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug, AsBytes)]
/// #[repr(u8)]
/// enum Phase {
///     Idle,
///     Running,
///     Draining,
/// }
///
/// let phase = EnumCell::new(Phase::Idle);
/// assert!(phase.transition(Phase::Running, Phase::Idle).exchanged);
/// assert!(!phase.transition(Phase::Draining, Phase::Idle).exchanged);
/// assert_eq!(phase.get(), Phase::Running);
/// ```
pub struct EnumCell<E> {
    inner: PodCell<E>,
}

impl<E: Copy + AsBytes> EnumCell<E> {
    /// Creates a cell holding `state`.
    pub fn new(state: E) -> Self {
        Self {
            inner: PodCell::new(state),
        }
    }

    /// Reads the current state.
    #[inline]
    pub fn get(&self) -> E {
        self.inner.load()
    }

    /// Unconditionally sets the state.
    #[inline]
    pub fn set(&self, state: E) {
        self.inner.store(state);
    }

    /// Replaces the state, reporting the previous one.
    #[inline]
    pub fn swap(&self, state: E) -> Exchange<E> {
        self.inner.swap(state)
    }

    /// Moves to `to` iff the cell currently holds `from`.
    ///
    /// The canonical state-machine step: one hardware CAS on the
    /// discriminant.
    #[inline]
    pub fn transition(&self, to: E, from: E) -> TryExchange<E> {
        self.inner.compare_exchange(to, from)
    }

    /// Computes the next state from the current one, retrying until the CAS
    /// wins. `f` may run once per attempt.
    #[inline]
    pub fn step(&self, f: impl FnMut(E) -> E) -> Exchange<E> {
        self.inner.update(f)
    }

    /// Computes the next state iff `predicate(current)` holds; reports
    /// failure without storing otherwise.
    #[inline]
    pub fn try_step(
        &self,
        f: impl FnMut(E) -> E,
        predicate: impl Fn(E) -> bool,
    ) -> TryExchange<E> {
        self.inner.try_update_if(f, predicate)
    }

    /// Consumes the cell, returning the final state.
    pub fn into_inner(self) -> E {
        self.inner.into_inner()
    }
}

impl<E: Copy + AsBytes + Default> Default for EnumCell<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: Copy + AsBytes + fmt::Debug> fmt::Debug for EnumCell<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumCell").field("state", &self.get()).finish()
    }
}

impl<E: Copy + AsBytes> From<E> for EnumCell<E> {
    fn from(state: E) -> Self {
        Self::new(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug, zerocopy::AsBytes)]
    #[repr(u8)]
    enum Gate {
        Closed,
        Opening,
        Open,
    }

    #[test]
    fn transition_is_a_guarded_step() {
        let gate = EnumCell::new(Gate::Closed);
        assert!(gate.transition(Gate::Opening, Gate::Closed).exchanged);
        assert!(!gate.transition(Gate::Open, Gate::Closed).exchanged);
        assert!(gate.transition(Gate::Open, Gate::Opening).exchanged);
        assert_eq!(gate.get(), Gate::Open);
    }

    #[test]
    fn step_advances_through_the_machine() {
        let gate = EnumCell::new(Gate::Closed);
        let ex = gate.step(|g| match g {
            Gate::Closed => Gate::Opening,
            Gate::Opening | Gate::Open => Gate::Open,
        });
        assert_eq!(ex.previous, Gate::Closed);
        assert_eq!(ex.current, Gate::Opening);
    }

    #[test]
    fn try_step_respects_the_predicate() {
        let gate = EnumCell::new(Gate::Open);
        let res = gate.try_step(|_| Gate::Closed, |g| g == Gate::Closed);
        assert!(!res.exchanged);
        assert_eq!(gate.get(), Gate::Open);
    }
}
