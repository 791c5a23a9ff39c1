#![forbid(unsafe_code)]

//! Reactive data bindings for fbind.
//!
//! This module provides change-tracking primitives for data binding:
//!
//! - [`ObservableArray`]: a shared sequence whose mutators emit
//!   `BeforeChange`/`Change` notifications with snapshots.
//! - [`Observable`]: a shared, version-tracked scalar with the same channels.
//! - [`Computed`]: a derived value that re-runs when a tracked read changes.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`dependency`]: the thread-local frames that tracked reads register in.
//!
//! # Architecture
//!
//! Observables use `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers and cleaned up lazily
//! during notification.
//!
//! # Invariants
//!
//! 1. Every notification pair is `BeforeChange` (old contents) then `Change`
//!    (new contents), both delivered before the mutator returns.
//! 2. Subscribers are notified in registration order.
//! 3. Only `get()` registers dependencies. `peek()`, `with()` and every
//!    mutator are untracked.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. No borrow is held while callbacks run, so re-entrant mutation from a
//!    subscriber is legal.

pub mod computed;
pub mod dependency;
pub mod destroy;
pub mod observable;
pub mod observable_array;
pub mod subscription;

pub use computed::Computed;
pub use dependency::{DependencyFrame, SourceId, Subscribable};
pub use destroy::{Destroyable, Record};
pub use observable::Observable;
pub use observable_array::ObservableArray;
pub use subscription::{Channel, Subscription};
