#![forbid(unsafe_code)]

//! Dynamic input values and aliasable array storage.
//!
//! A binding layer does not know statically what a template expression
//! evaluates to, so observable arrays accept an [`Input`] and reject every
//! kind that is not an array, null, or undefined.
//!
//! # Aliasing
//!
//! [`SharedArray`] is the storage an observable array mutates. Cloning a
//! handle aliases the same `Vec`, so a caller that keeps a clone of the
//! handle it passed in observes every later mutation:
//!
//! ```
//! use fbind_core::SharedArray;
//!
//! let original = SharedArray::new(vec!["Alpha", "Beta"]);
//! let alias = original.clone();
//! alias.with_mut(|v| v.retain(|s| *s != "Beta"));
//! assert_eq!(original.snapshot(), vec!["Alpha"]);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::SystemTime;

use crate::error::ReactiveError;

/// Reference-counted, interior-mutable sequence storage.
///
/// Clones share the same backing `Vec`. Borrows are short-lived: every
/// accessor releases its borrow before returning.
pub struct SharedArray<T> {
    items: Rc<RefCell<Vec<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for SharedArray<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}

impl<T> Default for SharedArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}

impl<T> From<Vec<T>> for SharedArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> SharedArray<T> {
    /// Wrap `items` in a new shared handle.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// Number of elements currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Borrow the elements immutably for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.borrow())
    }

    /// Borrow the backing `Vec` mutably for the duration of `f`.
    ///
    /// # Panics
    ///
    /// Panics if `f` re-enters this handle (RefCell borrow rules).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        f(&mut self.items.borrow_mut())
    }

    /// Replace the contents, returning the previous elements.
    pub fn replace(&self, items: Vec<T>) -> Vec<T> {
        std::mem::replace(&mut *self.items.borrow_mut(), items)
    }

    /// True when both handles alias the same storage.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.items, &b.items)
    }
}

impl<T: Clone> SharedArray<T> {
    /// Clone the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }
}

/// The kind of an [`Input`], used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Undefined,
    Null,
    Array,
    Text,
    Bool,
    Number,
    Object,
    Date,
    Function,
}

impl InputKind {
    /// Whether an observable array accepts inputs of this kind.
    #[must_use]
    pub const fn is_array_compatible(self) -> bool {
        matches!(self, Self::Undefined | Self::Null | Self::Array)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Array => "array",
            Self::Text => "string",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::Object => "object",
            Self::Date => "date",
            Self::Function => "function",
        };
        f.write_str(name)
    }
}

/// A loosely typed value as produced by a binding layer.
///
/// Only [`Input::Undefined`], [`Input::Null`] and [`Input::Array`] are
/// acceptable array contents; see [`Input::into_array`].
pub enum Input<T> {
    /// Nothing was supplied.
    Undefined,
    Null,
    /// An ordered sequence. The handle is aliased, not copied.
    Array(SharedArray<T>),
    Text(String),
    Bool(bool),
    Number(f64),
    /// A plain property bag (not array-like, even if it has a `size`).
    Object(serde_json::Map<String, serde_json::Value>),
    Date(SystemTime),
    Function(Rc<dyn Fn()>),
}

impl<T> Default for Input<T> {
    fn default() -> Self {
        Self::Undefined
    }
}

impl<T> Input<T> {
    /// Build an [`Input::Object`] from a JSON value's properties.
    ///
    /// Non-object JSON values produce an empty property bag.
    #[must_use]
    pub fn object(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self::Object(map),
            _ => Self::Object(serde_json::Map::new()),
        }
    }

    /// Wrap a closure as an [`Input::Function`].
    #[must_use]
    pub fn function(f: impl Fn() + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    #[must_use]
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Undefined => InputKind::Undefined,
            Self::Null => InputKind::Null,
            Self::Array(_) => InputKind::Array,
            Self::Text(_) => InputKind::Text,
            Self::Bool(_) => InputKind::Bool,
            Self::Number(_) => InputKind::Number,
            Self::Object(_) => InputKind::Object,
            Self::Date(_) => InputKind::Date,
            Self::Function(_) => InputKind::Function,
        }
    }

    /// Validate this input as array contents.
    ///
    /// Returns `Ok(None)` for null/undefined (callers treat it as empty),
    /// `Ok(Some(handle))` for arrays, and
    /// [`ReactiveError::InvalidArgument`] for everything else.
    pub fn into_array(self) -> Result<Option<SharedArray<T>>, ReactiveError> {
        match self {
            Self::Undefined | Self::Null => Ok(None),
            Self::Array(items) => Ok(Some(items)),
            other => Err(ReactiveError::invalid_argument(other.kind())),
        }
    }
}

impl<T> fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(items) => f.debug_tuple("Array").field(&items.len()).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Self::Date(at) => f.debug_tuple("Date").field(at).finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl<T> From<Vec<T>> for Input<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Array(SharedArray::new(items))
    }
}

impl<T> From<SharedArray<T>> for Input<T> {
    fn from(items: SharedArray<T>) -> Self {
        Self::Array(items)
    }
}

/// `None` maps to [`Input::Null`].
impl<T> From<Option<Vec<T>>> for Input<T> {
    fn from(items: Option<Vec<T>>) -> Self {
        items.map_or(Self::Null, Self::from)
    }
}
