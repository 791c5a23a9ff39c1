#![forbid(unsafe_code)]

//! Observable array: a sequence whose mutators announce themselves.
//!
//! # Design
//!
//! [`ObservableArray<T>`] keeps its elements in a [`SharedArray`] handle and
//! wraps every mutator in a notification pair:
//!
//! ```text
//! push(x)
//!   BeforeChange subscribers  <- snapshot of old contents
//!   backing Vec mutated in place (aliases see it)
//!   version += 1
//!   Change subscribers        <- snapshot of new contents
//!   return native result (new length)
//! ```
//!
//! Snapshots are only cloned when a channel has live subscribers.
//!
//! # Reads
//!
//! - [`get`](ObservableArray::get): tracked. Registers the array with the
//!   active dependency frame.
//! - [`peek`](ObservableArray::peek) / [`with`](ObservableArray::with): raw.
//!   Never register.
//!
//! Mutators only use the raw path, so calling them inside a tracked
//! computation never makes that computation depend on the array.
//!
//! # The `LENGTH` trap
//!
//! [`ObservableArray::LENGTH`] is a constant `0`, kept for parity with
//! binding layers whose array wrappers are functions with a fixed arity
//! `length`. It is never the element count. Use `peek().len()`.
//!
//! # Failure Modes
//!
//! - **Re-entrant mutation from a subscriber**: allowed. No borrow is held
//!   while callbacks run; the nested mutation and its notifications finish
//!   before the outer notification loop resumes.
//! - **Re-entrant access from a matcher**: predicates given to
//!   `remove_where`/`destroy_where`, and closures given to `with`, run while
//!   the backing `Vec` is borrowed. Touching the same array from inside them
//!   panics (RefCell borrow rules).
//! - **Mutation from a `BeforeChange` subscriber during `remove*`/`destroy*`**:
//!   matchers run once, before `BeforeChange` fires, and that decision fixes
//!   both the return value and whether a notification pair fires. If a
//!   subscriber then changes the array, the decided elements are taken out of
//!   (or marked in) the backing they were found in, looked up by equality.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use fbind_core::{ArrayConfig, Input, ReactiveError, SharedArray};
use tracing::{debug, trace};

use super::dependency::{self, SourceId, Subscribable};
use super::destroy::Destroyable;
use super::subscription::{Channel, Subscribers, Subscription};

/// Shared interior for [`ObservableArray<T>`].
struct ArrayInner<T> {
    items: SharedArray<T>,
    version: u64,
    config: ArrayConfig,
    subscribers: Subscribers<[T]>,
}

/// Elements picked by a removal or destroy matcher, decided before
/// `BeforeChange` fires.
struct Found<T> {
    items: SharedArray<T>,
    version: u64,
    len: usize,
    /// Ascending.
    indices: Vec<usize>,
    matched: Vec<T>,
}

impl<T> Found<T> {
    /// True when a `BeforeChange` subscriber changed the array after the
    /// match; `indices` no longer describe the contents then.
    fn is_stale(&self, array: &ObservableArray<T>) -> bool {
        array.inner.borrow().version != self.version || self.items.len() != self.len
    }
}

/// A shared sequence with before/after change notification.
///
/// Cloning an `ObservableArray` creates a new handle to the **same** array:
/// same elements, same subscribers, same [`SourceId`].
///
/// # Invariants
///
/// 1. Every notifying mutation fires `BeforeChange` then `Change`, exactly
///    once each, and bumps `version` by exactly 1.
/// 2. Subscribers are notified in registration order.
/// 3. `remove*`, `remove_all`, `destroy*`, `destroy_all` and `replace` do not
///    notify when nothing matches.
/// 4. No mutator registers a dependency.
pub struct ObservableArray<T> {
    id: SourceId,
    inner: Rc<RefCell<ArrayInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ObservableArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableArray")
            .field("id", &self.id)
            .field("items", &inner.items)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.total())
            .finish()
    }
}

impl<T> ObservableArray<T> {
    /// Always `0`. **Not** the element count; see the module docs.
    pub const LENGTH: usize = 0;
}

impl<T: Clone + PartialEq + 'static> Default for ObservableArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + PartialEq + 'static> From<Vec<T>> for ObservableArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: Clone + PartialEq + 'static> ObservableArray<T> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an array owning `items`.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self::build(SharedArray::new(items), ArrayConfig::default())
    }

    /// Create an array backed by the caller's handle. Mutations through the
    /// array are visible through every clone of `items`.
    #[must_use]
    pub fn from_shared(items: SharedArray<T>) -> Self {
        Self::build(items, ArrayConfig::default())
    }

    /// Create an array from a loosely typed input.
    ///
    /// Null and undefined produce an empty array; any other non-array input
    /// fails with [`ReactiveError::InvalidArgument`].
    pub fn from_input(input: Input<T>) -> Result<Self, ReactiveError> {
        Self::with_config(input, ArrayConfig::default())
    }

    /// Like [`from_input`](Self::from_input) with explicit configuration.
    pub fn with_config(input: Input<T>, config: ArrayConfig) -> Result<Self, ReactiveError> {
        let items = accept(input, config)?;
        Ok(Self::build(items, config))
    }

    fn build(items: SharedArray<T>, config: ArrayConfig) -> Self {
        Self {
            id: SourceId::next(),
            inner: Rc::new(RefCell::new(ArrayInner {
                items,
                version: 0,
                config,
                subscribers: Subscribers::default(),
            })),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Tracked read: registers this array with the active dependency frame,
    /// then returns a snapshot.
    #[must_use]
    pub fn get(&self) -> Vec<T> {
        dependency::register_with(self.id, || Rc::new(self.clone()) as Rc<dyn Subscribable>);
        self.peek()
    }

    /// Raw read: a snapshot without registering a dependency.
    #[must_use]
    pub fn peek(&self) -> Vec<T> {
        self.items().snapshot()
    }

    /// Borrow the elements without cloning or tracking.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this array.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.items().with(f)
    }

    /// The current backing handle. Writes through it bypass notification.
    #[must_use]
    pub fn shared(&self) -> SharedArray<T> {
        self.items()
    }

    /// Position of the first element equal to `item`, or `None`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.with(|items| items.iter().position(|x| x == item))
    }

    /// Number of notifying mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    #[must_use]
    pub fn config(&self) -> ArrayConfig {
        self.inner.borrow().config
    }

    // ========================================================================
    // Whole-value writes
    // ========================================================================

    /// Replace the contents. Always notifies, even if `items` equals the
    /// current contents.
    pub fn set(&self, items: Vec<T>) {
        self.replace_backing(SharedArray::new(items));
    }

    /// Replace the backing handle (aliased unless the config says copy).
    pub fn set_shared(&self, items: SharedArray<T>) {
        let items = if self.config().alias_input {
            items
        } else {
            SharedArray::new(items.snapshot())
        };
        self.replace_backing(items);
    }

    /// Replace the contents from a loosely typed input.
    ///
    /// A rejected input leaves the array and its subscribers untouched.
    pub fn write(&self, input: Input<T>) -> Result<(), ReactiveError> {
        let items = accept(input, self.config())?;
        self.replace_backing(items);
        Ok(())
    }

    fn replace_backing(&self, items: SharedArray<T>) {
        self.notify(Channel::BeforeChange);
        let (before, after, version) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.items.len();
            let after = items.len();
            inner.items = items;
            inner.version += 1;
            (before, after, inner.version)
        };
        self.log_mutation("write", before, after, version);
        self.notify(Channel::Change);
    }

    // ========================================================================
    // Standard mutators
    // ========================================================================

    /// Append `item`; returns the new length.
    pub fn push(&self, item: T) -> usize {
        self.mutate("push", |items| {
            items.push(item);
            items.len()
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<T> {
        self.mutate("pop", Vec::pop)
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<T> {
        self.mutate("shift", |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Prepend `item`; returns the new length.
    pub fn unshift(&self, item: T) -> usize {
        self.mutate("unshift", |items| {
            items.insert(0, item);
            items.len()
        })
    }

    /// Remove `delete_count` elements at `start`, insert `insert` in their
    /// place, and return the removed elements.
    ///
    /// `start` and `delete_count` are clamped to the array bounds.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        insert: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        self.mutate("splice", |items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect()
        })
    }

    pub fn reverse(&self) {
        self.mutate("reverse", |items| items.reverse());
    }

    /// Stable sort with a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.mutate("sort", |items| items.sort_by(compare));
    }

    /// Replace the first element equal to `old` with `new`.
    ///
    /// Returns whether a replacement happened. No match, no notification.
    pub fn replace(&self, old: &T, new: T) -> bool {
        if self.index_of(old).is_none() {
            return false;
        }
        self.mutate("replace", |items| match items.iter().position(|x| x == old) {
            Some(index) => {
                items[index] = new;
                true
            }
            None => false,
        })
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove every element equal to `item`; returns them in order.
    pub fn remove(&self, item: &T) -> Vec<T> {
        self.remove_matching("remove", |x| x == item)
    }

    /// Remove every element matching `predicate`; returns them in order.
    ///
    /// # Panics
    ///
    /// Panics if `predicate` touches this array.
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.remove_matching("remove", predicate)
    }

    /// Remove every element equal to one of `items`; returns the removed
    /// elements in their original relative order.
    pub fn remove_all(&self, items: &[T]) -> Vec<T> {
        self.remove_matching("removeAll", |x| items.contains(x))
    }

    /// Remove everything; returns the previous contents. Always notifies.
    pub fn clear(&self) -> Vec<T> {
        self.mutate("removeAll", std::mem::take)
    }

    fn remove_matching(&self, op: &'static str, matches: impl Fn(&T) -> bool) -> Vec<T> {
        let Some(found) = self.find(matches) else {
            return Vec::new();
        };
        self.notify(Channel::BeforeChange);
        let stale = found.is_stale(self);
        self.apply(op, &found.items, |items| {
            if stale {
                for item in &found.matched {
                    if let Some(index) = items.iter().position(|x| x == item) {
                        items.remove(index);
                    }
                }
                return found.matched;
            }
            let mut removed = Vec::with_capacity(found.indices.len());
            let mut kept = Vec::with_capacity(items.len() - found.indices.len());
            for (index, item) in std::mem::take(items).into_iter().enumerate() {
                if found.indices.binary_search(&index).is_ok() {
                    removed.push(item);
                } else {
                    kept.push(item);
                }
            }
            *items = kept;
            removed
        })
    }

    /// Run `matches` once over the current contents and remember the hits.
    fn find(&self, matches: impl Fn(&T) -> bool) -> Option<Found<T>> {
        let (items, version) = {
            let inner = self.inner.borrow();
            (inner.items.clone(), inner.version)
        };
        let (indices, matched, len) = items.with(|slice| {
            let mut indices = Vec::new();
            let mut matched = Vec::new();
            for (index, item) in slice.iter().enumerate() {
                if matches(item) {
                    indices.push(index);
                    matched.push(item.clone());
                }
            }
            (indices, matched, slice.len())
        });
        if indices.is_empty() {
            return None;
        }
        Some(Found {
            items,
            version,
            len,
            indices,
            matched,
        })
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe to the new contents after each mutation.
    pub fn subscribe(&self, callback: impl Fn(&[T]) + 'static) -> Subscription {
        self.subscribe_to(Channel::Change, callback)
    }

    /// Subscribe to the old contents just before each mutation.
    pub fn subscribe_before(&self, callback: impl Fn(&[T]) + 'static) -> Subscription {
        self.subscribe_to(Channel::BeforeChange, callback)
    }

    pub fn subscribe_to(
        &self,
        channel: Channel,
        callback: impl Fn(&[T]) + 'static,
    ) -> Subscription {
        self.inner.borrow_mut().subscribers.add(channel, callback)
    }

    /// Subscribe by string tag (`"change"` or `"beforeChange"`).
    pub fn subscribe_tagged(
        &self,
        tag: &str,
        callback: impl Fn(&[T]) + 'static,
    ) -> Result<Subscription, ReactiveError> {
        let channel = tag.parse::<Channel>()?;
        Ok(self.subscribe_to(channel, callback))
    }

    /// Live subscribers on `channel`.
    #[must_use]
    pub fn subscription_count_for(&self, channel: Channel) -> usize {
        self.inner.borrow().subscribers.count(channel)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn items(&self) -> SharedArray<T> {
        self.inner.borrow().items.clone()
    }

    /// Run `f` against the backing `Vec` between a notification pair.
    fn mutate<R>(&self, op: &'static str, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        self.notify(Channel::BeforeChange);
        // Fetched after BeforeChange: a subscriber may have swapped the backing.
        let items = self.items();
        self.apply(op, &items, f)
    }

    /// Second half of [`mutate`](Self::mutate): mutate `items`, bump the
    /// version, and notify `Change`.
    fn apply<R>(
        &self,
        op: &'static str,
        items: &SharedArray<T>,
        f: impl FnOnce(&mut Vec<T>) -> R,
    ) -> R {
        let (before, after, result) = items.with_mut(|items| {
            let before = items.len();
            let result = f(items);
            (before, items.len(), result)
        });
        let version = {
            let mut inner = self.inner.borrow_mut();
            inner.version += 1;
            inner.version
        };
        self.log_mutation(op, before, after, version);
        self.notify(Channel::Change);
        result
    }

    /// Notify live subscribers on one channel with a snapshot.
    fn notify(&self, channel: Channel) {
        // Collect live callbacks first (to avoid holding the borrow during calls).
        let (callbacks, items) = {
            let mut inner = self.inner.borrow_mut();
            (inner.subscribers.live(channel), inner.items.clone())
        };
        if callbacks.is_empty() {
            return;
        }
        let snapshot = items.snapshot();
        for cb in &callbacks {
            cb(&snapshot);
        }
    }

    fn log_mutation(&self, op: &'static str, before: usize, after: usize, version: u64) {
        if self.inner.borrow().config.trace_mutations {
            trace!(source = %self.id, op, before, after, version, "observable array mutated");
        }
    }
}

impl<T: Clone + Ord + 'static> ObservableArray<T> {
    /// Stable ascending sort.
    pub fn sort(&self) {
        self.mutate("sort", |items| items.sort());
    }
}

impl<T: Clone + PartialEq + Destroyable + 'static> ObservableArray<T> {
    /// Mark every element equal to `item` as destroyed; length is unchanged.
    /// Returns the marked elements.
    pub fn destroy(&self, item: &T) -> Vec<T> {
        self.destroy_matching("destroy", |x| x == item)
    }

    /// Mark every element matching `predicate` as destroyed.
    ///
    /// # Panics
    ///
    /// Panics if `predicate` touches this array.
    pub fn destroy_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.destroy_matching("destroy", predicate)
    }

    /// Mark every element equal to one of `items` as destroyed.
    pub fn destroy_all(&self, items: &[T]) -> Vec<T> {
        self.destroy_matching("destroyAll", |x| items.contains(x))
    }

    /// Mark every element as destroyed. Always notifies.
    pub fn destroy_all_items(&self) -> Vec<T> {
        self.mutate("destroyAll", |items| {
            items
                .iter_mut()
                .map(|item| {
                    item.mark_destroyed();
                    item.clone()
                })
                .collect()
        })
    }

    fn destroy_matching(&self, op: &'static str, matches: impl Fn(&T) -> bool) -> Vec<T> {
        let Some(found) = self.find(matches) else {
            return Vec::new();
        };
        self.notify(Channel::BeforeChange);
        let stale = found.is_stale(self);
        self.apply(op, &found.items, |items| {
            if stale {
                let mut marked = found.matched;
                for item in &mut marked {
                    if let Some(slot) = items.iter_mut().find(|x| **x == *item) {
                        slot.mark_destroyed();
                    }
                    item.mark_destroyed();
                }
                return marked;
            }
            found
                .indices
                .iter()
                .map(|&index| {
                    items[index].mark_destroyed();
                    items[index].clone()
                })
                .collect()
        })
    }
}

impl<T: Clone + PartialEq + 'static> Subscribable for ObservableArray<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn subscribe_changes(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }

    fn subscription_count(&self) -> usize {
        self.inner.borrow().subscribers.total()
    }

    fn is_observable_array(&self) -> bool {
        true
    }
}

/// Validate an input and apply the aliasing policy.
fn accept<T: Clone>(input: Input<T>, config: ArrayConfig) -> Result<SharedArray<T>, ReactiveError> {
    let kind = input.kind();
    match input.into_array() {
        Ok(Some(items)) if config.alias_input => Ok(items),
        Ok(Some(items)) => Ok(SharedArray::new(items.snapshot())),
        Ok(None) => Ok(SharedArray::default()),
        Err(err) => {
            debug!(found = %kind, "rejected observable array input");
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::destroy::Record;
    use std::cell::Cell;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn recorder<T: Clone + PartialEq + 'static>(
        array: &ObservableArray<T>,
        channel: Channel,
    ) -> (Rc<RefCell<Vec<Vec<T>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let sub = array.subscribe_to(channel, move |items| log_clone.borrow_mut().push(items.to_vec()));
        (log, sub)
    }

    #[test]
    fn version_counts_notifying_mutations() {
        let arr = ObservableArray::new(vec![1, 2, 3]);
        assert_eq!(arr.version(), 0);
        arr.push(4);
        arr.pop();
        arr.remove(&99);
        assert_eq!(arr.version(), 2);
        arr.set(vec![1, 2, 3]);
        assert_eq!(arr.version(), 3);
    }

    #[test]
    fn pop_on_empty_still_notifies() {
        let arr: ObservableArray<i32> = ObservableArray::default();
        let (after, _sub) = recorder(&arr, Channel::Change);
        assert_eq!(arr.pop(), None);
        assert_eq!(arr.shift(), None);
        assert_eq!(after.borrow().len(), 2);
    }

    #[test]
    fn shift_unshift() {
        let arr = ObservableArray::new(vec!['b', 'c']);
        assert_eq!(arr.unshift('a'), 3);
        assert_eq!(arr.shift(), Some('a'));
        assert_eq!(arr.peek(), vec!['b', 'c']);
    }

    #[test]
    fn splice_clamps_and_inserts() {
        let arr = ObservableArray::new(vec![1, 2, 3]);
        assert_eq!(arr.splice(1, 100, [7, 8]), vec![2, 3]);
        assert_eq!(arr.peek(), vec![1, 7, 8]);
        assert!(arr.splice(10, 1, []).is_empty());
        assert_eq!(arr.peek(), vec![1, 7, 8]);
    }

    #[test]
    fn sort_and_reverse() {
        let arr = ObservableArray::new(vec![3, 1, 2]);
        arr.sort();
        assert_eq!(arr.peek(), vec![1, 2, 3]);
        arr.reverse();
        assert_eq!(arr.peek(), vec![3, 2, 1]);
        arr.sort_by(|a, b| (a % 2).cmp(&(b % 2)).then(a.cmp(b)));
        assert_eq!(arr.peek(), vec![2, 1, 3]);
    }

    #[test]
    fn remove_removes_every_duplicate() {
        let arr = ObservableArray::new(vec!["a", "b", "a", "c"]);
        assert_eq!(arr.remove(&"a"), vec!["a", "a"]);
        assert_eq!(arr.peek(), vec!["b", "c"]);
    }

    #[test]
    fn remove_all_zero_matches_is_silent() {
        let arr = ObservableArray::new(vec![1, 2]);
        let (before, _b) = recorder(&arr, Channel::BeforeChange);
        let (after, _a) = recorder(&arr, Channel::Change);
        assert!(arr.remove_all(&[5, 6]).is_empty());
        assert!(arr.remove_all(&[]).is_empty());
        assert!(before.borrow().is_empty());
        assert!(after.borrow().is_empty());
    }

    #[test]
    fn clear_on_empty_still_notifies() {
        let arr: ObservableArray<u8> = ObservableArray::default();
        let (after, _sub) = recorder(&arr, Channel::Change);
        assert!(arr.clear().is_empty());
        assert_eq!(*after.borrow(), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn replace_without_match_is_silent() {
        let arr = ObservableArray::new(vec![1, 2]);
        let (after, _sub) = recorder(&arr, Channel::Change);
        assert!(!arr.replace(&3, 4));
        assert!(after.borrow().is_empty());
        assert!(arr.replace(&2, 4));
        assert_eq!(*after.borrow(), vec![vec![1, 4]]);
    }

    #[test]
    fn destroy_without_match_is_silent() {
        let x = Record::shared(1);
        let arr = ObservableArray::new(vec![Rc::clone(&x)]);
        let (after, _sub) = recorder(&arr, Channel::Change);
        assert!(arr.destroy(&Record::shared(2)).is_empty());
        assert!(after.borrow().is_empty());
        assert!(!x.is_destroyed());
    }

    #[test]
    fn destroy_where_marks_matches() {
        let arr = ObservableArray::new(vec![Record::new(1), Record::new(2), Record::new(3)]);
        let marked = arr.destroy_where(|r| r.value() % 2 == 1);
        assert_eq!(marked.len(), 2);
        let flags: Vec<bool> = arr.with(|items| items.iter().map(|r| r.is_destroyed()).collect());
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn reentrant_push_from_subscriber() {
        let arr = ObservableArray::new(vec![1]);
        let inner = arr.clone();
        let _sub = arr.subscribe(move |items| {
            if items.len() < 4 {
                inner.push(items.len() as i32 + 1);
            }
        });
        arr.push(2);
        assert_eq!(arr.peek(), vec![1, 2, 3, 4]);
        assert_eq!(arr.version(), 3);
    }

    #[test]
    fn before_change_subscriber_may_swap_backing() {
        let arr = ObservableArray::new(vec![1]);
        let inner = arr.clone();
        let swapped = Rc::new(Cell::new(false));
        let swapped_clone = Rc::clone(&swapped);
        let _sub = arr.subscribe_before(move |_| {
            if !swapped_clone.replace(true) {
                inner.set(vec![10]);
            }
        });
        arr.push(2);
        assert_eq!(arr.peek(), vec![10, 2]);
    }

    #[test]
    fn copying_config_breaks_alias() {
        let original = SharedArray::new(vec![1, 2, 3]);
        let arr = ObservableArray::with_config(Input::from(original.clone()), ArrayConfig::copying())
            .unwrap();
        arr.pop();
        assert_eq!(original.snapshot(), vec![1, 2, 3]);

        arr.set_shared(original.clone());
        arr.clear();
        assert_eq!(original.len(), 3);
    }

    #[test]
    fn aliasing_is_the_default() {
        let original = SharedArray::new(vec![1, 2, 3]);
        let arr = ObservableArray::from_shared(original.clone());
        arr.push(4);
        assert_eq!(original.snapshot(), vec![1, 2, 3, 4]);
        assert!(SharedArray::ptr_eq(&arr.shared(), &original));
    }

    #[test]
    fn rejected_write_is_silent() {
        let arr = ObservableArray::new(vec![1]);
        let (after, _sub) = recorder(&arr, Channel::Change);
        let err = arr.write(Input::Bool(true)).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(after.borrow().is_empty());
        assert_eq!(arr.peek(), vec![1]);
        assert_eq!(arr.version(), 0);
    }

    #[test]
    fn subscribe_tagged_parses_channels() {
        let arr = ObservableArray::new(vec![0u8]);
        let _before = arr.subscribe_tagged("beforeChange", |_| {}).unwrap();
        let _after = arr.subscribe_tagged("change", |_| {}).unwrap();
        assert_eq!(arr.subscription_count_for(Channel::BeforeChange), 1);
        assert_eq!(arr.subscription_count_for(Channel::Change), 1);
        assert!(arr.subscribe_tagged("arrayChange", |_| {}).is_err());
    }

    #[test]
    fn matcher_runs_once_per_element() {
        let calls = Rc::new(Cell::new(0));
        let arr = ObservableArray::new(vec![1, 2, 3]);
        let calls_clone = Rc::clone(&calls);
        assert_eq!(
            arr.remove_where(move |x| {
                calls_clone.set(calls_clone.get() + 1);
                *x == 2
            }),
            vec![2]
        );
        assert_eq!(calls.get(), 3);

        calls.set(0);
        let records = ObservableArray::new(vec![Record::new(1), Record::new(2), Record::new(3)]);
        let calls_clone = Rc::clone(&calls);
        let marked = records.destroy_where(move |r| {
            calls_clone.set(calls_clone.get() + 1);
            *r.value() > 1
        });
        assert_eq!(marked.len(), 2);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn remove_keeps_its_match_when_before_change_swaps_backing() {
        let original = SharedArray::new(vec![1, 2, 3]);
        let arr = ObservableArray::from_shared(original.clone());
        let inner = arr.clone();
        let swapped = Rc::new(Cell::new(false));
        let swapped_clone = Rc::clone(&swapped);
        let _swap = arr.subscribe_before(move |_| {
            if !swapped_clone.replace(true) {
                inner.set(vec![7]);
            }
        });
        let (after, _sub) = recorder(&arr, Channel::Change);

        assert_eq!(arr.remove(&2), vec![2]);
        // One pair from the nested set, one from the removal itself.
        assert_eq!(*after.borrow(), vec![vec![7], vec![7]]);
        assert_eq!(arr.version(), 2);
        assert_eq!(arr.peek(), vec![7]);
        assert_eq!(original.snapshot(), vec![1, 3]);
    }

    #[test]
    fn destroy_keeps_its_match_when_before_change_swaps_backing() {
        let keep = Record::shared(1);
        let doomed = Record::shared(2);
        let arr = ObservableArray::new(vec![Rc::clone(&keep), Rc::clone(&doomed)]);
        let inner = arr.clone();
        let swapped = Rc::new(Cell::new(false));
        let swapped_clone = Rc::clone(&swapped);
        let _swap = arr.subscribe_before(move |_| {
            if !swapped_clone.replace(true) {
                inner.set(vec![Record::shared(9)]);
            }
        });

        let marked = arr.destroy(&doomed);
        assert_eq!(marked.len(), 1);
        assert!(doomed.is_destroyed());
        assert!(!keep.is_destroyed());
        assert_eq!(arr.version(), 2);
        assert!(arr.with(|items| !items[0].is_destroyed()));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = Captured::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn trace_mutations_emits_events() {
        let arr = ObservableArray::with_config(
            Input::from(vec![1]),
            ArrayConfig::default().with_trace_mutations(true),
        )
        .unwrap();
        let logs = captured_logs(|| {
            arr.push(2);
        });
        assert!(logs.contains("observable array mutated"), "{logs}");
        assert!(logs.contains("push"), "{logs}");
        assert!(logs.contains("before=1"), "{logs}");
        assert!(logs.contains("after=2"), "{logs}");
        assert!(logs.contains("version=1"), "{logs}");
    }

    #[test]
    fn mutations_are_quiet_without_trace_flag() {
        let arr = ObservableArray::new(vec![1]);
        let logs = captured_logs(|| {
            arr.push(2);
            arr.clear();
        });
        assert!(!logs.contains("observable array mutated"), "{logs}");
    }

    #[test]
    fn env_derived_config_reaches_the_array() {
        let config = ArrayConfig::from_env_with(|key| {
            (key == fbind_core::config::ENV_ALIAS_INPUT).then(|| "0".to_string())
        });
        let original = SharedArray::new(vec![1, 2]);
        let arr = ObservableArray::with_config(Input::from(original.clone()), config).unwrap();
        arr.push(3);
        assert_eq!(original.snapshot(), vec![1, 2]);
        assert_eq!(arr.peek(), vec![1, 2, 3]);
    }

    #[test]
    fn debug_format() {
        let arr = ObservableArray::new(vec![1, 2]);
        let dbg = format!("{arr:?}");
        assert!(dbg.contains("ObservableArray"));
        assert!(dbg.contains("[1, 2]"));
    }
}
