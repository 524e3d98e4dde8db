use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a conformer, unique within one ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConformerId(String);

impl ConformerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier given to the `index`-th (zero-based) frame of an input file.
    pub fn from_index(index: usize) -> Self {
        Self(format!("CONF{}", index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ConformerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConformerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConformerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
