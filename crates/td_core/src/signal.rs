//! Per-entity publish/subscribe.
//!
//! Entities expose their observable changes (movement, health, firing)
//! as [`Signal`]s. Observers are plain closures; the simulation itself
//! never depends on them, they exist for presentation layers and tests.
//!
//! Pooled entities are reused, so every owner must call
//! [`Signal::clear`] before the entity goes back to its pool. Otherwise a
//! listener attached during one life-cycle would fire for the next.

use std::fmt;

/// Handle returned by [`Signal::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered list of observers for one kind of notification.
pub struct Signal<T> {
    observers: Vec<(ObserverId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register an observer. Observers are notified in subscription order.
    pub fn subscribe(&mut self, observer: impl FnMut(&T) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove one observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Notify every observer.
    pub fn emit(&mut self, value: &T) {
        for (_, observer) in &mut self.observers {
            observer(value);
        }
    }

    /// Detach all observers.
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observers are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// A resettable piece of entity state with its own observers.
///
/// Implemented by every property an entity is composed of, so the owner
/// can restore it to a fresh state before pooling.
pub trait Property {
    /// Restore initial values.
    fn reset_value(&mut self);

    /// Detach every observer of every signal this property owns.
    fn clear_observers(&mut self);
}
