use std::fmt;

use serde::{Deserialize, Serialize};

/// A single named unit of work.
///
/// The label is opaque: it is only used to identify the task in logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task(String);

impl Task {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Task {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Task {
    fn from(s: String) -> Self {
        Self(s)
    }
}
