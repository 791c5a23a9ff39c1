#![forbid(unsafe_code)]

//! Runtime: observables, observable arrays, and dependency tracking.
//!
//! # Role in fbind
//! `fbind-runtime` is the notification engine a data-binding layer sits on.
//! It turns the plain storage and validation from `fbind-core` into values
//! that announce their mutations.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use fbind_runtime::ObservableArray;
//!
//! let todos = ObservableArray::new(vec!["write", "test"]);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = Rc::clone(&seen);
//! let _sub = todos.subscribe(move |items| seen_clone.borrow_mut().push(items.to_vec()));
//!
//! assert_eq!(todos.push("ship"), 3);
//! assert_eq!(todos.remove(&"write"), vec!["write"]);
//! assert_eq!(
//!     *seen.borrow(),
//!     vec![vec!["write", "test", "ship"], vec!["test", "ship"]]
//! );
//! ```

pub mod reactive;

pub use fbind_core::{ArrayConfig, Input, InputKind, ReactiveError, SharedArray};
pub use reactive::{
    Channel, Computed, Destroyable, Observable, ObservableArray, Record, SourceId, Subscribable,
    Subscription,
};
