//! String preprocessors applied to configuration values while loading.
//!
//! Both functions are idempotent. The serde helpers run them during
//! deserialization so the in-memory configuration is already normalized.

use serde::{Deserialize, Deserializer};
use std::borrow::Cow;

/// Prefix `path` with `/` unless it already starts with one.
pub fn ensure_path_starts_with_slash(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Strip every trailing `/` from `value`.
pub fn remove_trailing_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

/// Deserialize an optional endpoint with trailing slashes removed.
pub fn deserialize_endpoint<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| remove_trailing_slash(&v).to_string()))
}

/// Deserialize an optional path, adding a leading slash when missing.
pub fn deserialize_slash_path<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| ensure_path_starts_with_slash(&v).into_owned()))
}
