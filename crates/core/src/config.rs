//! Typed reads of environment-style settings.
//!
//! Every loader takes a lookup closure rather than touching the process
//! environment directly, so configuration structs can be built from a
//! fixed map in tests. Binaries pass [`process_env`].

use std::fmt::Display;
use std::str::FromStr;

use crate::error::CoreError;

/// Variable lookup: returns the raw value for a key, if set.
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Trimmed value of `key`, treating blank values as unset.
pub fn optional(lookup: VarLookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Value of `key`, failing when unset or blank.
pub fn required(lookup: VarLookup<'_>, key: &'static str) -> Result<String, CoreError> {
    optional(lookup, key).ok_or(CoreError::MissingConfig(key))
}

/// String value of `key`, or `default` when unset.
pub fn string_or(lookup: VarLookup<'_>, key: &str, default: &str) -> String {
    optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse `key` as `T`, or return `default` when unset.
pub fn parse_or<T>(lookup: VarLookup<'_>, key: &'static str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| CoreError::Config {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn flag_or(lookup: VarLookup<'_>, key: &'static str, default: bool) -> Result<bool, CoreError> {
    let Some(raw) = optional(lookup, key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Config {
            key,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_or_uses_default_when_unset_or_blank() {
        let map = vars(&[("BLANK", "   ")]);
        let lookup = |k: &str| map.get(k).cloned();
        assert_eq!(parse_or::<u64>(&lookup, "MISSING", 60).unwrap(), 60);
        assert_eq!(parse_or::<u64>(&lookup, "BLANK", 60).unwrap(), 60);
    }

    #[test]
    fn parse_or_reports_bad_values() {
        let map = vars(&[("SYNC_INTERVAL_SECS", "soon")]);
        let lookup = |k: &str| map.get(k).cloned();
        let err = parse_or::<u64>(&lookup, "SYNC_INTERVAL_SECS", 60).unwrap_err();
        assert!(err.to_string().contains("SYNC_INTERVAL_SECS"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn flag_or_accepts_common_spellings() {
        let map = vars(&[("A", "YES"), ("B", "0"), ("C", "maybe")]);
        let lookup = |k: &str| map.get(k).cloned();
        assert!(flag_or(&lookup, "A", false).unwrap());
        assert!(!flag_or(&lookup, "B", true).unwrap());
        assert!(flag_or(&lookup, "C", true).is_err());
        assert!(flag_or(&lookup, "D", true).unwrap());
    }

    #[test]
    fn required_rejects_blank() {
        let map = vars(&[("URL", "")]);
        let lookup = |k: &str| map.get(k).cloned();
        assert!(matches!(
            required(&lookup, "URL"),
            Err(CoreError::MissingConfig("URL"))
        ));
    }
}
