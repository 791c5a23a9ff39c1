#![forbid(unsafe_code)]

//! Error type shared by every fbind crate.

use crate::input::InputKind;

/// Errors raised by observable construction, writes, and channel parsing.
///
/// Lookups that find nothing (`remove` without a match, `destroy` on an
/// absent item) are not errors; they return empty results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// An observable array was constructed or written with something other
    /// than an array, null, or undefined.
    InvalidArgument { found: InputKind },
    /// A subscription channel tag was neither `"change"` nor `"beforeChange"`.
    UnknownChannel(String),
}

impl ReactiveError {
    /// Shorthand for [`ReactiveError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(found: InputKind) -> Self {
        Self::InvalidArgument { found }
    }

    /// True for [`ReactiveError::InvalidArgument`].
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

impl std::fmt::Display for ReactiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { found } => write!(
                f,
                "an observable array must be given an array, null, or undefined (found {found})"
            ),
            Self::UnknownChannel(tag) => write!(f, "unknown subscription channel '{tag}'"),
        }
    }
}

impl std::error::Error for ReactiveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_rejected_kind() {
        let err = ReactiveError::invalid_argument(InputKind::Date);
        let msg = err.to_string();
        assert!(msg.contains("array, null, or undefined"));
        assert!(msg.contains("date"));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn unknown_channel_display() {
        let err = ReactiveError::UnknownChannel("afterChange".into());
        assert_eq!(err.to_string(), "unknown subscription channel 'afterChange'");
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn usable_as_boxed_error() {
        let boxed: Box<dyn std::error::Error> =
            Box::new(ReactiveError::invalid_argument(InputKind::Number));
        assert!(boxed.to_string().contains("number"));
    }
}
