//! Filter identity for a listing view.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::slug;

/// The active filter combination of a listing view.
///
/// Filters are stored in name order, so two keys built from the same
/// name/value pairs compare equal regardless of insertion order. Empty values
/// are never stored: clearing a filter and never setting it are the same key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterKey(BTreeMap<String, String>);

impl FilterKey {
    /// Creates an empty key (no filters).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key with `name` set to `value`, or removed if `value` is
    /// blank.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the key with `name` set to the slug form of `raw`.
    pub fn with_slug(self, name: impl Into<String>, raw: &str) -> Self {
        self.with(name, slug::normalize(raw))
    }

    /// Sets or clears a single filter.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            self.0.remove(&name);
        } else {
            self.0.insert(name, value.to_owned());
        }
    }

    /// Returns the value of a filter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns whether no filter is active.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        for (idx, (name, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for FilterKey
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut key = Self::new();
        for (name, value) in iter {
            key.set(name, value);
        }
        key
    }
}
