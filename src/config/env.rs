//! Environment variable utilities for provider configuration.

/// Reads environment-style variables through a lookup function.
///
/// [`EnvLookup::process`] reads the real process environment; tests and embedders
/// can supply any other source without touching global state.
#[derive(Clone, Copy)]
pub struct EnvLookup<F> {
    lookup: F,
}

fn process_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl EnvLookup<fn(&str) -> Option<String>> {
    pub fn process() -> Self {
        Self {
            lookup: process_var,
        }
    }
}

impl<F: Fn(&str) -> Option<String>> EnvLookup<F> {
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Get an optional variable. Blank values count as unset.
    pub fn opt(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a boolean variable.
    ///
    /// Returns `true` if the value is "1" or "true" (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.opt(key)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Get the first set variable among `keys`.
    pub fn with_fallbacks(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.opt(key))
    }
}

#[cfg(test)]
pub(crate) fn from_pairs(
    pairs: &[(&str, &str)],
) -> EnvLookup<impl Fn(&str) -> Option<String> + use<>> {
    let vars: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvLookup::new(move |key: &str| vars.get(key).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag() {
        let env = from_pairs(&[
            ("TEST_BOOL_1", "1"),
            ("TEST_BOOL_TRUE", "true"),
            ("TEST_BOOL_TRUE_UPPER", "TRUE"),
            ("TEST_BOOL_FALSE", "false"),
            ("TEST_BOOL_ZERO", "0"),
        ]);

        assert!(env.flag("TEST_BOOL_1"));
        assert!(env.flag("TEST_BOOL_TRUE"));
        assert!(env.flag("TEST_BOOL_TRUE_UPPER"));
        assert!(!env.flag("TEST_BOOL_FALSE"));
        assert!(!env.flag("TEST_BOOL_ZERO"));
        assert!(!env.flag("TEST_BOOL_NONEXISTENT"));
    }

    #[test]
    fn test_blank_is_unset() {
        let env = from_pairs(&[("BLANK", "  "), ("SET", "value")]);
        assert_eq!(env.opt("BLANK"), None);
        assert_eq!(env.opt("SET").as_deref(), Some("value"));
    }

    #[test]
    fn test_fallbacks() {
        let env = from_pairs(&[("AWS_DEFAULT_REGION", "eu-central-1")]);
        assert_eq!(
            env.with_fallbacks(&["AWS_REGION", "AWS_DEFAULT_REGION"])
                .as_deref(),
            Some("eu-central-1")
        );
        assert_eq!(env.with_fallbacks(&["MISSING"]), None);
    }

    #[test]
    fn test_process_lookup() {
        let env = EnvLookup::process();
        assert!(env.opt("KUBE_CLOUD_AUTH_SURELY_UNSET_VARIABLE").is_none());
    }
}
