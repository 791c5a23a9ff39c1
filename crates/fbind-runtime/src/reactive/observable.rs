#![forbid(unsafe_code)]

//! Scalar observable with before/after notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). When the value changes (determined by
//! `PartialEq`), live `BeforeChange` subscribers see the old value, then the
//! value is replaced, then live `Change` subscribers see the new one.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone               |
//! | `set()`       | O(S) where S = subscribers |
//! | `subscribe()` | O(1) amortized             |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: allowed. No borrow is held while callbacks run, so a
//!   subscriber may call `set()`; the nested notification completes before
//!   the outer loop moves to its next subscriber.
//! - **Subscriber leak**: `Subscription` guards stored indefinitely keep
//!   their callbacks alive. Dead weak references are pruned on notify.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::dependency::{self, SourceId, Subscribable};
use super::subscription::{Channel, Subscribers, Subscription};

/// Shared interior for [`Observable<T>`].
struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Subscribers<T>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** inner state.
/// Both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op on both channels.
/// 3. Subscribers are notified in registration order.
/// 4. `get()` registers a dependency; `peek()` and `with()` never do.
pub struct Observable<T> {
    id: SourceId,
    inner: Rc<RefCell<ObservableInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.total())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            id: SourceId::next(),
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Subscribers::default(),
            })),
        }
    }

    /// Tracked read: registers this observable with the active dependency
    /// frame, then returns a clone of the value.
    #[must_use]
    pub fn get(&self) -> T {
        self.track();
        self.peek()
    }

    /// Raw read: a clone of the value without registering a dependency.
    #[must_use]
    pub fn peek(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning or tracking.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value. If it differs from the current value (by
    /// `PartialEq`), notifies `BeforeChange` with the old value, stores the
    /// new one, bumps the version, and notifies `Change`.
    pub fn set(&self, value: T) {
        if self.inner.borrow().value == value {
            return;
        }
        self.notify(Channel::BeforeChange);
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            inner.version += 1;
            trace!(source = %self.id, version = inner.version, "observable set");
        }
        self.notify(Channel::Change);
    }

    /// Modify the value in place via a closure. Notifies only if the value
    /// changed (compared by `PartialEq` against a snapshot).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.peek();
        f(&mut next);
        self.set(next);
    }

    /// Subscribe to value changes.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.subscribe_to(Channel::Change, callback)
    }

    /// Subscribe to the old value just before each change.
    pub fn subscribe_before(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.subscribe_to(Channel::BeforeChange, callback)
    }

    pub fn subscribe_to(&self, channel: Channel, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.borrow_mut().subscribers.add(channel, callback)
    }

    /// Current version number. Useful for dirty-checking in render loops.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Live subscribers on `channel`.
    #[must_use]
    pub fn subscription_count_for(&self, channel: Channel) -> usize {
        self.inner.borrow().subscribers.count(channel)
    }

    fn track(&self) {
        dependency::register_with(self.id, || Rc::new(self.clone()) as Rc<dyn Subscribable>);
    }

    /// Notify live subscribers on one channel with the current value.
    fn notify(&self, channel: Channel) {
        // Collect live callbacks first (to avoid holding the borrow during calls).
        let callbacks = self.inner.borrow_mut().subscribers.live(channel);
        if callbacks.is_empty() {
            return;
        }
        let value = self.peek();
        for cb in &callbacks {
            cb(&value);
        }
    }
}

impl<T: Clone + PartialEq + 'static> Subscribable for Observable<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn subscribe_changes(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }

    fn subscription_count(&self) -> usize {
        self.inner.borrow().subscribers.total()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
