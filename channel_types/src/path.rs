//! Callback paths
//!
//! A callback path is a slash-joined key sequence identifying where, inside
//! a request's parameters, an invocable value was extracted from (on the
//! sending side) or should be reconstructed (on the receiving side).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slash-joined key sequence addressing a nested parameter value
///
/// `"a/b"` addresses `params["a"]["b"]`. Segments are plain map keys; a key
/// containing `/` cannot be addressed and is never produced by the
/// marshaler's own traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackPath(String);

impl CallbackPath {
    /// Creates a path from its wire form
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Builds a path by joining key segments with `/`
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    /// Returns the wire form of the path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the key segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns true if the path has no content
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallbackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallbackPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for CallbackPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
