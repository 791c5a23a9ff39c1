#![forbid(unsafe_code)]

//! Configuration for observable arrays.
//!
//! Defaults reproduce the classic binding-library behavior: arrays passed in
//! are aliased, and per-mutation tracing is off. Both can be flipped from the
//! environment:
//!
//! | Variable                   | Field             | Default |
//! |----------------------------|-------------------|---------|
//! | `FBIND_ARRAY_ALIAS_INPUT`  | `alias_input`     | `true`  |
//! | `FBIND_TRACE_MUTATIONS`    | `trace_mutations` | `false` |
//!
//! Flags accept `1`, `true`, `yes`, `on` (case-insensitive); any other value
//! reads as false.
//!
//! Array constructors always start from [`ArrayConfig::default`]. The
//! environment only applies when a caller loads it with
//! [`ArrayConfig::from_env`] and passes the result to
//! `ObservableArray::with_config`.

/// Environment variable controlling [`ArrayConfig::alias_input`].
pub const ENV_ALIAS_INPUT: &str = "FBIND_ARRAY_ALIAS_INPUT";
/// Environment variable controlling [`ArrayConfig::trace_mutations`].
pub const ENV_TRACE_MUTATIONS: &str = "FBIND_TRACE_MUTATIONS";

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Behavior knobs for an observable array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayConfig {
    /// Keep the caller's array handle as backing storage (mutations are
    /// visible through the caller's alias). When false, inputs are copied.
    pub alias_input: bool,
    /// Emit a `trace!` event for every notifying mutation.
    pub trace_mutations: bool,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            alias_input: true,
            trace_mutations: false,
        }
    }
}

impl ArrayConfig {
    /// Copy inputs instead of aliasing them.
    #[must_use]
    pub fn copying() -> Self {
        Self {
            alias_input: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alias_input(mut self, enabled: bool) -> Self {
        self.alias_input = enabled;
        self
    }

    #[must_use]
    pub fn with_trace_mutations(mut self, enabled: bool) -> Self {
        self.trace_mutations = enabled;
        self
    }

    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides using a custom environment lookup.
    ///
    /// Unset variables keep their defaults.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            alias_input: get_env(ENV_ALIAS_INPUT)
                .map_or(defaults.alias_input, |v| env_flag(&v)),
            trace_mutations: get_env(ENV_TRACE_MUTATIONS)
                .map_or(defaults.trace_mutations, |v| env_flag(&v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_alias_and_stay_quiet() {
        let cfg = ArrayConfig::default();
        assert!(cfg.alias_input);
        assert!(!cfg.trace_mutations);
    }

    #[test]
    fn empty_env_keeps_defaults() {
        assert_eq!(ArrayConfig::from_env_with(lookup(&[])), ArrayConfig::default());
    }

    #[test]
    fn env_flags_parse_truthy_words() {
        for word in ["1", "true", "YES", " on "] {
            let cfg = ArrayConfig::from_env_with(lookup(&[(ENV_TRACE_MUTATIONS, word)]));
            assert!(cfg.trace_mutations, "{word:?} should enable tracing");
        }
    }

    #[test]
    fn env_can_disable_aliasing() {
        let cfg = ArrayConfig::from_env_with(lookup(&[(ENV_ALIAS_INPUT, "0")]));
        assert!(!cfg.alias_input);
        assert_eq!(cfg, ArrayConfig::copying());
    }

    #[test]
    fn from_env_reads_the_process_environment() {
        let expected = ArrayConfig::from_env_with(|key| std::env::var(key).ok());
        assert_eq!(ArrayConfig::from_env(), expected);
    }

    #[test]
    fn builders_compose() {
        let cfg = ArrayConfig::default()
            .with_alias_input(false)
            .with_trace_mutations(true);
        assert!(!cfg.alias_input);
        assert!(cfg.trace_mutations);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unrecognized_words_read_as_false(word in "[a-z]{2,8}") {
                prop_assume!(!matches!(word.as_str(), "true" | "yes" | "on"));
                let cfg = ArrayConfig::from_env_with(lookup(&[
                    (ENV_ALIAS_INPUT, word.as_str()),
                    (ENV_TRACE_MUTATIONS, word.as_str()),
                ]));
                prop_assert!(!cfg.alias_input);
                prop_assert!(!cfg.trace_mutations);
            }

            #[test]
            fn builders_set_exactly_what_they_name(alias in any::<bool>(), trace in any::<bool>()) {
                let cfg = ArrayConfig::default()
                    .with_alias_input(alias)
                    .with_trace_mutations(trace);
                prop_assert_eq!(cfg, ArrayConfig { alias_input: alias, trace_mutations: trace });
            }
        }
    }
}
