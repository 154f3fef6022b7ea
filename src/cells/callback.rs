use core::fmt;
use std::sync::Arc;

use crate::sync::ArcCell;

/// A subscribed callback, also the token that identifies it.
///
/// Handlers are compared by identity ([`Arc::ptr_eq`]), so the same closure
/// subscribed twice yields two independent subscriptions.
pub type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// An atomically replaceable list of callbacks.
///
/// A shape specialization of [`ArcCell`]: the cell holds an immutable
/// `Arc<Vec<Handler<A>>>` and every mutation builds a fresh list and swings
/// the reference over with a CAS retry loop (copy-on-write). Emission
/// therefore never blocks mutation and vice versa: [`emit`](Self::emit)
/// snapshots the list once and invokes that snapshot, so a handler
/// subscribed or removed mid-emit takes effect on the next emit, not the
/// current one.
///
/// # Examples
///
/// ```
/// use casket::CallbackCell;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let cell = CallbackCell::new();
///
/// let counter = Arc::clone(&hits);
/// let token = cell.subscribe(move |n: &u32| {
///     counter.fetch_add(*n, Ordering::Relaxed);
/// });
///
/// cell.emit(&3);
/// assert_eq!(hits.load(Ordering::Relaxed), 3);
///
/// assert!(cell.unsubscribe(&token));
/// cell.emit(&3);
/// assert_eq!(hits.load(Ordering::Relaxed), 3);
/// ```
pub struct CallbackCell<A> {
    handlers: ArcCell<Vec<Handler<A>>>,
}

impl<A> CallbackCell<A> {
    /// Creates a cell with no subscribers.
    pub fn new() -> Self {
        Self {
            handlers: ArcCell::empty(),
        }
    }

    fn snapshot(&self) -> Option<Arc<Vec<Handler<A>>>> {
        self.handlers.get()
    }

    /// Appends `handler` to the list, returning the token that identifies
    /// this subscription.
    pub fn subscribe(&self, handler: impl Fn(&A) + Send + Sync + 'static) -> Handler<A> {
        let token: Handler<A> = Arc::new(handler);
        self.subscribe_handler(Arc::clone(&token));
        token
    }

    /// Appends an existing [`Handler`], e.g. one removed from another cell.
    pub fn subscribe_handler(&self, handler: Handler<A>) {
        self.handlers.update(|current| {
            let mut list: Vec<Handler<A>> =
                current.map_or_else(Vec::new, |existing| existing.to_vec());
            list.push(Arc::clone(&handler));
            Some(Arc::new(list))
        });
    }

    /// Removes the subscription identified by `token`; returns whether it
    /// was present. Only the first identity match is removed.
    pub fn unsubscribe(&self, token: &Handler<A>) -> bool {
        let mut removed = false;
        self.handlers.update(|current| {
            removed = false;
            let Some(existing) = current else {
                return None;
            };
            let Some(at) = existing.iter().position(|h| Arc::ptr_eq(h, token)) else {
                return Some(existing);
            };
            removed = true;
            let mut list = existing.to_vec();
            list.remove(at);
            if list.is_empty() {
                None
            } else {
                Some(Arc::new(list))
            }
        });
        removed
    }

    /// Invokes every currently subscribed handler with `argument`, in
    /// subscription order.
    pub fn emit(&self, argument: &A) {
        if let Some(list) = self.snapshot() {
            for handler in list.iter() {
                handler(argument);
            }
        }
    }

    /// Number of current subscriptions.
    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, |list| list.len())
    }

    /// Whether no handler is subscribed.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_none()
    }

    /// Drops every subscription at once.
    pub fn clear(&self) {
        self.handlers.set(None);
    }
}

impl<A> Default for CallbackCell<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for CallbackCell<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCell")
            .field("handlers", &self.len())
            .finish()
    }
}
