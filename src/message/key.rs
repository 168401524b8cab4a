//! Correlation key type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, comparable token grouping related messages together
///
/// Keys are only required to be unique among currently live groups; a key
/// whose group has been released may be reused by a later group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CorrelationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for CorrelationKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}
