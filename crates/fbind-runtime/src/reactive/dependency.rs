#![forbid(unsafe_code)]

//! Dependency detection frames.
//!
//! A computation that wants to know which observables it reads opens a
//! [`DependencyFrame`], runs, and calls [`DependencyFrame::finish`]. Every
//! *tracked* read (`get()`) performed while the frame is on top of the
//! thread-local stack registers its source there. *Raw* reads (`peek()`,
//! `with()`) and every mutator never register.
//!
//! # Invariants
//!
//! 1. **Thread isolation**: frames on one thread never see reads on another.
//! 2. **Innermost wins**: only the top frame receives registrations; an
//!    [`ignore`] frame on top swallows them.
//! 3. **Dedup**: a source registers at most once per frame, in first-read
//!    order.
//! 4. **Cleanup guarantee**: dropping a frame pops it, even on panic.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::subscription::Subscription;

/// Identity of an observable, stable for its lifetime and shared by clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Allocate a fresh id (unique per thread).
    #[must_use]
    pub fn next() -> Self {
        thread_local! {
            static NEXT_ID: Cell<u64> = const { Cell::new(1) };
        }
        NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            Self(id)
        })
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something a dependency tracker can subscribe to.
///
/// Implemented by [`Observable`](super::Observable) and
/// [`ObservableArray`](super::ObservableArray).
pub trait Subscribable {
    fn source_id(&self) -> SourceId;

    /// Subscribe to the change channel with a payload-free callback.
    fn subscribe_changes(&self, callback: Rc<dyn Fn()>) -> Subscription;

    /// Live subscriptions across all channels.
    fn subscription_count(&self) -> usize;

    fn is_observable_array(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Collect,
    Ignore,
}

struct Frame {
    kind: FrameKind,
    seen: HashSet<SourceId>,
    sources: Vec<Rc<dyn Subscribable>>,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

fn push_frame(kind: FrameKind) -> usize {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        frames.push(Frame {
            kind,
            seen: HashSet::new(),
            sources: Vec::new(),
        });
        frames.len() - 1
    })
}

fn pop_frame(depth: usize) -> Vec<Rc<dyn Subscribable>> {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        debug_assert_eq!(frames.len(), depth + 1, "dependency frames popped out of order");
        let sources = frames
            .get_mut(depth)
            .map(|frame| std::mem::take(&mut frame.sources))
            .unwrap_or_default();
        frames.truncate(depth);
        sources
    })
}

/// RAII guard for an open collecting frame.
#[must_use = "a frame collects nothing once dropped"]
pub struct DependencyFrame {
    depth: usize,
    open: bool,
}

impl DependencyFrame {
    /// Pop the frame and return the sources read while it was on top.
    pub fn finish(mut self) -> Vec<Rc<dyn Subscribable>> {
        self.open = false;
        pop_frame(self.depth)
    }
}

impl Drop for DependencyFrame {
    fn drop(&mut self) {
        if self.open {
            pop_frame(self.depth);
        }
    }
}

impl fmt::Debug for DependencyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyFrame")
            .field("depth", &self.depth)
            .finish()
    }
}

/// Open a collecting frame on this thread.
pub fn begin() -> DependencyFrame {
    DependencyFrame {
        depth: push_frame(FrameKind::Collect),
        open: true,
    }
}

/// Run `f` with dependency registration suppressed.
pub fn ignore<R>(f: impl FnOnce() -> R) -> R {
    struct IgnoreGuard(usize);
    impl Drop for IgnoreGuard {
        fn drop(&mut self) {
            pop_frame(self.0);
        }
    }

    let _guard = IgnoreGuard(push_frame(FrameKind::Ignore));
    f()
}

/// True when a collecting frame is on top of the stack.
#[must_use]
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .last()
            .is_some_and(|frame| frame.kind == FrameKind::Collect)
    })
}

/// Register a source with the innermost collecting frame.
pub fn register(source: Rc<dyn Subscribable>) {
    register_with(source.source_id(), move || source);
}

/// Register lazily: `make` only runs if a collecting frame wants `id`.
pub(crate) fn register_with(id: SourceId, make: impl FnOnce() -> Rc<dyn Subscribable>) {
    let wanted = FRAMES.with(|frames| {
        frames
            .borrow()
            .last()
            .is_some_and(|frame| frame.kind == FrameKind::Collect && !frame.seen.contains(&id))
    });
    if !wanted {
        return;
    }
    let source = make();
    FRAMES.with(|frames| {
        if let Some(frame) = frames.borrow_mut().last_mut() {
            if frame.seen.insert(id) {
                frame.sources.push(source);
            }
        }
    });
}
