//! Key-value entry type.

use serde::{Deserialize, Serialize};

/// A single key-value pair stored under a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// The key, unique within its table.
    pub key: String,
    /// The value.
    pub value: String,
}

impl Entry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Entry {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
