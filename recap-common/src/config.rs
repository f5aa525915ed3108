//! Environment variable helpers.

use std::str::FromStr;

/// Read an environment variable, falling back to `default` when unset or empty.
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read an optional environment variable; empty values count as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` on absence or
/// parse failure.
pub fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_falls_back_on_bad_value() {
        std::env::set_var("RECAP_TEST_BAD_INT", "not-a-number");
        assert_eq!(env_parse_or("RECAP_TEST_BAD_INT", 42u32), 42);
        std::env::remove_var("RECAP_TEST_BAD_INT");
    }

    #[test]
    fn empty_string_counts_as_unset() {
        std::env::set_var("RECAP_TEST_EMPTY", "");
        assert_eq!(env_or("RECAP_TEST_EMPTY", "fallback"), "fallback");
        assert_eq!(env_opt("RECAP_TEST_EMPTY"), None);
        std::env::remove_var("RECAP_TEST_EMPTY");
    }
}
