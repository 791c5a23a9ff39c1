#![forbid(unsafe_code)]

//! Computed values that re-evaluate when a tracked dependency changes.
//!
//! A [`Computed<T>`] runs its closure inside a [`DependencyFrame`], then
//! subscribes to the `Change` channel of every source the closure read with
//! a tracked `get()`. When any of them changes, the closure runs again and
//! the dependency set is rebuilt from scratch.
//!
//! Reads through `peek()`/`with()`, and every mutator, leave no edge, so a
//! computation can mutate an observable array without scheduling itself.
//!
//! [`DependencyFrame`]: super::dependency::DependencyFrame

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::dependency::{self, SourceId, Subscribable};
use super::subscription::Subscription;

struct ComputedInner<T> {
    evaluate: Box<dyn Fn() -> T>,
    value: RefCell<T>,
    dependencies: RefCell<Vec<(SourceId, Subscription)>>,
    evaluations: Cell<u64>,
    evaluating: Cell<bool>,
    disposed: Cell<bool>,
}

/// A derived value kept up to date with its tracked dependencies.
///
/// Cloning shares the same computation.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.inner.value.borrow())
            .field("evaluations", &self.inner.evaluations.get())
            .field("dependencies", &self.inner.dependencies.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

/// Run `evaluate` inside a fresh frame.
fn run<T>(evaluate: &dyn Fn() -> T) -> (T, Vec<Rc<dyn Subscribable>>) {
    let frame = dependency::begin();
    let value = evaluate();
    (value, frame.finish())
}

impl<T: 'static> Computed<T> {
    /// Evaluate `evaluate` once and start tracking what it read.
    pub fn new(evaluate: impl Fn() -> T + 'static) -> Self {
        let evaluate: Box<dyn Fn() -> T> = Box::new(evaluate);
        let (value, sources) = run(evaluate.as_ref());
        let inner = Rc::new(ComputedInner {
            evaluate,
            value: RefCell::new(value),
            dependencies: RefCell::new(Vec::new()),
            evaluations: Cell::new(1),
            evaluating: Cell::new(false),
            disposed: Cell::new(false),
        });
        attach(&inner, &sources);
        Self { inner }
    }

    /// How many times the closure has run.
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }

    /// Sources read with a tracked read during the last evaluation.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Ids of the current dependencies, in first-read order.
    #[must_use]
    pub fn dependency_ids(&self) -> Vec<SourceId> {
        self.inner
            .dependencies
            .borrow()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    /// Drop every dependency subscription; the value freezes.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.dependencies.borrow_mut().clear();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Access the latest value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// The latest value.
    #[must_use]
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

/// Replace the dependency subscriptions with fresh ones for `sources`.
fn attach<T: 'static>(inner: &Rc<ComputedInner<T>>, sources: &[Rc<dyn Subscribable>]) {
    let weak: Weak<ComputedInner<T>> = Rc::downgrade(inner);
    let subscriptions: Vec<(SourceId, Subscription)> = sources
        .iter()
        .map(|source| {
            let weak = weak.clone();
            let callback: Rc<dyn Fn()> = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    reevaluate(&inner);
                }
            });
            (source.source_id(), source.subscribe_changes(callback))
        })
        .collect();
    // Old subscriptions drop here; a notify loop already running keeps its
    // own strong handles until it finishes.
    *inner.dependencies.borrow_mut() = subscriptions;
}

fn reevaluate<T: 'static>(inner: &Rc<ComputedInner<T>>) {
    if inner.disposed.get() || inner.evaluating.replace(true) {
        return;
    }
    let (value, sources) = run(inner.evaluate.as_ref());
    inner.evaluating.set(false);
    *inner.value.borrow_mut() = value;
    inner.evaluations.set(inner.evaluations.get() + 1);
    debug!(
        evaluations = inner.evaluations.get(),
        dependencies = sources.len(),
        "computed re-evaluated"
    );
    attach(inner, &sources);
}
