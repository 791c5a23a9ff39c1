#![forbid(unsafe_code)]

//! Subscriber lists, notification channels, and the RAII [`Subscription`].
//!
//! Callbacks are stored as `Weak` references; the matching strong `Rc` lives
//! inside the [`Subscription`] handed back to the caller. Dropping (or
//! disposing) the handle makes the weak entry dead, and dead entries are
//! pruned the next time the list is walked.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use fbind_core::ReactiveError;

/// The two notification channels every observable exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Fired before a mutation with the old contents.
    BeforeChange,
    /// Fired after a mutation with the new contents.
    #[default]
    Change,
}

impl Channel {
    /// The string tag used by binding layers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeChange => "beforeChange",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ReactiveError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "change" => Ok(Self::Change),
            "beforeChange" => Ok(Self::BeforeChange),
            other => Err(ReactiveError::UnknownChannel(other.to_string())),
        }
    }
}

type CallbackRc<A> = Rc<dyn Fn(&A)>;
type CallbackWeak<A> = Weak<dyn Fn(&A)>;

/// Per-channel callback lists, in registration order.
pub(crate) struct Subscribers<A: ?Sized> {
    before_change: Vec<CallbackWeak<A>>,
    change: Vec<CallbackWeak<A>>,
}

impl<A: ?Sized> Default for Subscribers<A> {
    fn default() -> Self {
        Self {
            before_change: Vec::new(),
            change: Vec::new(),
        }
    }
}

impl<A: ?Sized + 'static> Subscribers<A> {
    fn list(&self, channel: Channel) -> &Vec<CallbackWeak<A>> {
        match channel {
            Channel::BeforeChange => &self.before_change,
            Channel::Change => &self.change,
        }
    }

    fn list_mut(&mut self, channel: Channel) -> &mut Vec<CallbackWeak<A>> {
        match channel {
            Channel::BeforeChange => &mut self.before_change,
            Channel::Change => &mut self.change,
        }
    }

    pub(crate) fn add(&mut self, channel: Channel, callback: impl Fn(&A) + 'static) -> Subscription {
        let strong: CallbackRc<A> = Rc::new(callback);
        let list = self.list_mut(channel);
        list.retain(|w| w.strong_count() > 0);
        list.push(Rc::downgrade(&strong));
        Subscription {
            channel,
            _guard: Box::new(strong),
        }
    }

    /// Prune dead entries and return strong handles to the live ones.
    ///
    /// Callers invoke the returned callbacks after releasing any borrow on
    /// the owning observable, so callbacks may freely re-enter it.
    pub(crate) fn live(&mut self, channel: Channel) -> Vec<CallbackRc<A>> {
        let list = self.list_mut(channel);
        list.retain(|w| w.strong_count() > 0);
        list.iter().filter_map(Weak::upgrade).collect()
    }

    /// Live subscribers on one channel (dead entries are not counted).
    pub(crate) fn count(&self, channel: Channel) -> usize {
        self.list(channel)
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub(crate) fn total(&self) -> usize {
        self.count(Channel::BeforeChange) + self.count(Channel::Change)
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` causes the associated callback to become
/// unreachable: the strong `Rc` is dropped, so the `Weak` in the
/// observable's subscriber list fails to upgrade from then on.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    channel: Channel,
    /// Type-erased strong reference keeping the callback `Rc` alive.
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Channel this subscription listens on.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn dispose(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
