//! Environment variable helpers used by the `from_env` constructors.

use std::env;
use std::str::FromStr;

/// Interpret a flag value the way operators write them in `.env` files.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read a boolean flag, falling back to `default` when unset.
pub fn flag(name: &str, default: bool) -> bool {
    env::var(name).map_or(default, |value| is_truthy(&value))
}

/// Read and parse a variable, falling back to `default` when unset or unparsable.
pub fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a string variable with a default.
pub fn string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
