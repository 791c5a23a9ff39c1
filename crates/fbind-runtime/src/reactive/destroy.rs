#![forbid(unsafe_code)]

//! Soft-delete markers for array elements.
//!
//! `destroy` on an observable array does not remove anything; it flips a
//! per-element `destroyed` flag so a rendering layer can hide the element
//! while a persistence layer still sees it (and can issue the delete).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Elements that can carry a destroyed marker.
pub trait Destroyable {
    fn is_destroyed(&self) -> bool;

    /// Set the marker. Idempotent.
    fn mark_destroyed(&mut self);
}

/// A value plus a destroyed flag.
///
/// The flag lives in a `Cell`, so an `Rc<Record<V>>` shared between the
/// array and outside code shows the mark through every alias.
///
/// Equality compares values only; the flag is bookkeeping.
#[derive(Clone, Default)]
pub struct Record<V> {
    value: V,
    destroyed: Cell<bool>,
}

impl<V> Record<V> {
    #[must_use]
    pub fn new(value: V) -> Self {
        Self {
            value,
            destroyed: Cell::new(false),
        }
    }

    /// Convenience for the common shared form.
    #[must_use]
    pub fn shared(value: V) -> Rc<Self> {
        Rc::new(Self::new(value))
    }

    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V: PartialEq> PartialEq for Record<V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<V: fmt::Debug> fmt::Debug for Record<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("value", &self.value)
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<V> Destroyable for Record<V> {
    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn mark_destroyed(&mut self) {
        self.destroyed.set(true);
    }
}

impl<V> Destroyable for Rc<Record<V>> {
    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn mark_destroyed(&mut self) {
        self.destroyed.set(true);
    }
}
